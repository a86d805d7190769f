//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication checks
//! - Business logic execution via the model registry and storage provider
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`chat`]: Streaming chat completions
//! - [`models`]: Model discovery for the frontend's model picker
//! - [`uploads`]: Client-upload token grants and store completion callbacks
//!
//! # Authentication
//!
//! All handlers require authentication via the frontend's session cookie or the same
//! session token as a bearer header. The [`crate::auth`] module provides the
//! [`crate::api::models::users::CurrentUser`] extractor handlers use for this.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and response bodies.

pub mod chat;
pub mod models;
pub mod uploads;
