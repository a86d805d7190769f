//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Wire fidelity**: the upload types mirror the blob store's camelCase JSON exactly,
//!   since both the browser SDK and the store itself parse them
//! - **Validation**: models use serde for deserialization; the upload policy lives next
//!   to the upload types it constrains
//! - **OpenAPI**: all models are annotated with `utoipa` for automatic API docs
//!
//! # Model Categories
//!
//! - [`chat`]: Chat completion request payloads
//! - [`models`]: Model discovery responses
//! - [`uploads`]: Client-upload protocol envelopes and the upload policy
//! - [`users`]: The authenticated user attached to requests
//!
//! # Example
//!
//! ```ignore
//! use uplink::api::models::uploads::{UploadEnvelope, UploadResponse};
//!
//! // Deserialize from JSON
//! let envelope: UploadEnvelope = serde_json::from_str(json_str)?;
//!
//! // Serialize to JSON
//! let response = UploadResponse::completed();
//! let json = serde_json::to_string(&response)?;
//! ```

pub mod chat;
pub mod models;
pub mod uploads;
pub mod users;
