//! Model serving layer
//!
//! Everything between the HTTP handlers and the upstream inference providers: the slot
//! catalog clients select models from, the provider clients, and stream middleware.

pub mod catalog;
pub mod providers;
pub mod reasoning;
