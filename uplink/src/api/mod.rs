//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! The API is divided into three functional areas:
//!
//! - **Chat** (`/api/chat`): Streaming chat completions against the model catalog
//! - **Models** (`/api/models`): Discovery of the user-selectable chat models
//! - **Files** (`/api/files/upload`): Brokered direct-to-store uploads, serving both the
//!   uploading browser and the store's completion callbacks
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
