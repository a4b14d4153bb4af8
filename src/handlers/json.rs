// handlers/json.rs - JSON body extractor answering with the standard error envelope
//
// axum's own `Json` rejects malformed or mistyped bodies with a plain-text
// 400/415/422. Handlers take this wrapper instead so every body error is a
// 400 carrying `{success, error, message, code}`.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => "Expected request with `Content-Type: application/json`".to_string(),
        _ => rejection.body_text(),
    };
    tracing::debug!("Rejected JSON body: {}", message);
    ApiError::bad_request(message)
}
