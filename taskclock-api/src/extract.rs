/// Request body extractors
///
/// Body failures go through [`ApiError`] so that clients always receive the
/// JSON error envelope, never axum's plain-text rejections.

use crate::error::{ApiError, ApiResult};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

/// `Json<T>` with rejections mapped to [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Parses an optional JSON body; an empty body is `None`
pub fn optional_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Note {
        note: Option<String>,
    }

    #[test]
    fn test_empty_body_is_none() {
        assert_eq!(optional_json::<Note>(&Bytes::new()).unwrap(), None);
        assert_eq!(optional_json::<Note>(&Bytes::from_static(b" \n")).unwrap(), None);
    }

    #[test]
    fn test_body_is_parsed() {
        let parsed = optional_json::<Note>(&Bytes::from_static(br#"{"note":"a"}"#)).unwrap();
        assert_eq!(
            parsed,
            Some(Note {
                note: Some("a".to_string())
            })
        );
    }

    #[test]
    fn test_bad_body_is_validation_error() {
        match optional_json::<Note>(&Bytes::from_static(br#"{"note":5}"#)) {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "body"),
            other => panic!("unexpected result: {other:?}"),
        }

        match optional_json::<Note>(&Bytes::from_static(b"{not json")) {
            Err(ApiError::BadRequest(detail)) => assert!(detail.starts_with("JSON parse error")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
