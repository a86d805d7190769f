//! Test utilities for integration testing (available with `test-utils` feature).

use std::sync::{Arc, Once};
use uuid::Uuid;

use crate::AppState;
use crate::ai::catalog::ModelRegistry;
use crate::api::models::users::CurrentUser;
use crate::config::{Config, StorageConfig};
use crate::storage::create_provider;

/// Read-write store token used by tests. Store id is `teststore`.
pub const TEST_STORE_TOKEN: &str = "blob_rw_teststore_testsecret";

/// Install the process-wide rustls crypto provider.
///
/// `reqwest` is built with `rustls-no-provider`, so constructing any HTTP client panics
/// until a provider is installed. `main` does this at startup; tests go through here.
pub fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .ok();
    });
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        storage: StorageConfig::Managed {
            token: TEST_STORE_TOKEN.to_string(),
            callback_url: None,
        },
        ..Default::default()
    }
}

pub fn create_test_state(config: Config) -> AppState {
    install_crypto_provider();
    let registry = Arc::new(ModelRegistry::from_config(&config.providers));
    let storage = create_provider(&config.storage).expect("Failed to create storage provider");

    AppState::builder().config(config).registry(registry).storage(storage).build()
}

pub fn test_user() -> CurrentUser {
    let user_id = Uuid::new_v4();
    CurrentUser {
        id: user_id,
        email: format!("testuser_{}@example.com", user_id.simple()),
    }
}

// axum-test is a dev-dependency, so the server helper only exists for this crate's own tests
#[cfg(test)]
pub fn create_test_server(state: AppState) -> axum_test::TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    axum_test::TestServer::new(router).expect("Failed to create test server")
}
