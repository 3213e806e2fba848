/// Request authentication
///
/// Resolves an `Authorization: Bearer <jwt>` header into an [`AuthContext`]
/// for the handlers. The token's `sub` must name a user known to the store;
/// tokens for unknown users are rejected like invalid ones.
///
/// # Usage with Axum
///
/// ```ignore
/// async fn auth_layer(State(state): State<AppState>, mut req: Request, next: Next)
///     -> Result<Response, AuthError>
/// {
///     let ctx = authenticate(req.headers(), &state.jwt_secret, state.store.as_ref()).await?;
///     req.extensions_mut().insert(ctx);
///     Ok(next.run(req).await)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::User;
use crate::store::Store;

/// The authenticated caller, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    pub email: String,

    /// Name shown in comment notifications
    pub display_name: String,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.display_name(),
        }
    }
}

/// Authentication failures
#[derive(Debug)]
pub enum AuthError {
    /// No Authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Bad signature, expired, wrong issuer, or unknown user
    InvalidToken(String),

    /// User lookup failed
    StoreError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication credentials were not provided.".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AuthError::StoreError(msg) => {
                tracing::error!(error = %msg, "User lookup failed during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": error, "detail": detail }))).into_response()
    }
}

/// Validates the bearer token in `headers` and loads the caller
pub async fn authenticate(
    headers: &HeaderMap,
    secret: &str,
    store: &dyn Store,
) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    let user = store
        .get_user(claims.sub)
        .await
        .map_err(|e| AuthError::StoreError(e.to_string()))?
        .ok_or_else(|| AuthError::InvalidToken("User not found".to_string()))?;

    Ok(AuthContext::from_user(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use crate::models::user::CreateUser;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_authenticate_known_user() {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                email: "ann@example.com".to_string(),
                first_name: "Ann".to_string(),
                last_name: "Lee".to_string(),
            })
            .await
            .unwrap();
        let token = create_token(&Claims::new(user.id), SECRET).unwrap();

        let ctx = authenticate(&bearer(&token), SECRET, &store).await.unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.display_name, "Ann Lee");
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let store = MemoryStore::new();
        let token = create_token(&Claims::new(Uuid::new_v4()), SECRET).unwrap();

        assert!(matches!(
            authenticate(&bearer(&token), SECRET, &store).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_missing_header() {
        let store = MemoryStore::new();
        assert!(matches!(
            authenticate(&HeaderMap::new(), SECRET, &store).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_scheme() {
        let store = MemoryStore::new();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));

        assert!(matches!(
            authenticate(&headers, SECRET, &store).await,
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::StoreError("down".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
