//! Authentication for requests arriving from the chat frontend.
//!
//! This service does not run a login flow of its own. Sessions are created by the frontend's
//! auth layer and verified here with the shared `secret_key`. Two ways of presenting the same
//! session token are supported:
//!
//! ## 1. Session Cookie
//!
//! Browser requests carry the session JWT in the cookie named by `auth.session.cookie_name`.
//!
//! ## 2. Bearer Token
//!
//! Non-browser callers (scripts, tests, server-to-server) send the session JWT in an
//! `Authorization: Bearer <token>` header.
//!
//! # Modules
//!
//! - [`current_user`]: Extractors for getting the authenticated user in handlers
//! - [`session`]: Session token verification (and creation, for the shared-contract tests)
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use uplink::api::models::users::CurrentUser;
//!
//! async fn protected_handler(user: CurrentUser) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", user.email))
//! }
//! ```

pub mod current_user;
pub mod session;
