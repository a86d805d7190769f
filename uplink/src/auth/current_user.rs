use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Extract user from JWT session cookie if present and valid
/// Returns:
/// - None: No JWT cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): JWT cookie present but invalid/malformed
#[instrument(skip(parts, config))]
fn try_jwt_session_auth(parts: &axum::http::request::Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                // Try to verify the JWT session token
                match session::verify_session_token(value, config) {
                    Ok(user) => return Some(Ok(user)),
                    Err(_) => {
                        // Invalid/expired token, continue checking other cookies or return None
                        // We don't propagate JWT verification errors as they're expected for expired tokens
                        continue;
                    }
                }
            }
        }
    }
    None
}

/// Extract user from a bearer token in the Authorization header if present and valid.
/// Non-browser callers send the same session JWT as a bearer token instead of a cookie.
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid session token found and verified
/// - Some(Err(error)): Bearer token present but invalid
#[instrument(skip(parts, config))]
fn try_bearer_session_auth(parts: &axum::http::request::Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    // Check for Bearer token format
    let token = match auth_str.strip_prefix("Bearer ") {
        Some(token) => token,
        None => return None, // Not a Bearer token, try other auth methods
    };

    Some(session::verify_session_token(token, config))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Try all authentication methods and accumulate results
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the auth method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means auth credentials were present but invalid
        //
        // Strategy: Try ALL methods and return the first successful one.
        // Only fail if ALL methods either weren't present or failed.
        // This allows a user with a valid session cookie + a stale bearer token to still authenticate.

        let mut auth_errors = Vec::new();
        let mut any_auth_attempted = false;

        // Try bearer token authentication first (most specific)
        match try_bearer_session_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found bearer authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Bearer authentication failed: {:?}", e);
                any_auth_attempted = true;
                auth_errors.push(("Bearer", e));
            }
            None => {
                trace!("No bearer authentication attempted");
            }
        }

        // Session cookie authentication
        match try_jwt_session_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found JWT session authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("JWT session authentication failed: {:?}", e);
                any_auth_attempted = true;
                auth_errors.push(("JWT session", e));
            }
            None => {
                trace!("No JWT session authentication attempted");
            }
        }

        // If we get here, no auth method succeeded
        if !any_auth_attempted {
            trace!("No authentication credentials found in request");
            Err(Error::Unauthenticated { message: None })
        } else {
            trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
            Err(Error::Unauthenticated { message: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session_token;
    use crate::test_utils::{create_test_config, create_test_state};
    use uuid::Uuid;

    fn test_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "session@example.com".to_string(),
        }
    }

    fn parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    #[tokio::test]
    async fn test_session_cookie_extraction() {
        let config = create_test_config();
        let state = create_test_state(config.clone());
        let user = test_user();

        let token = create_session_token(&user, &config).unwrap();
        let cookie = format!("{}={}", config.auth.session.cookie_name, token);
        let mut parts = parts_with_header("cookie", &cookie);

        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
        assert_eq!(extracted.email, user.email);
    }

    #[tokio::test]
    async fn test_session_cookie_among_other_cookies() {
        let config = create_test_config();
        let state = create_test_state(config.clone());
        let user = test_user();

        let token = create_session_token(&user, &config).unwrap();
        let cookie = format!("theme=dark; {}={}; locale=en", config.auth.session.cookie_name, token);
        let mut parts = parts_with_header("cookie", &cookie);

        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[tokio::test]
    async fn test_bearer_token_extraction() {
        let config = create_test_config();
        let state = create_test_state(config.clone());
        let user = test_user();

        let token = create_session_token(&user, &config).unwrap();
        let mut parts = parts_with_header("authorization", &format!("Bearer {token}"));

        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[tokio::test]
    async fn test_no_credentials_rejected() {
        let config = create_test_config();
        let state = create_test_state(config);

        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_garbage_cookie_rejected() {
        let config = create_test_config();
        let state = create_test_state(config.clone());

        let cookie = format!("{}=definitely-not-a-jwt", config.auth.session.cookie_name);
        let mut parts = parts_with_header("cookie", &cookie);

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_stale_bearer_with_valid_cookie_still_authenticates() {
        let config = create_test_config();
        let state = create_test_state(config.clone());
        let user = test_user();

        let token = create_session_token(&user, &config).unwrap();
        let cookie = format!("{}={}", config.auth.session.cookie_name, token);
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header("authorization", "Bearer stale-garbage")
            .header("cookie", &cookie)
            .body(())
            .unwrap();
        let (mut parts, _body) = request.into_parts();

        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
    }
}
