use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// JSON body extractor that ignores the content type and reports any read or
/// decode failure as [`AppError::InvalidRequestFormat`].
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::error!(error = %e, "failed to read request body");
            AppError::InvalidRequestFormat
        })?;
        // Only the first JSON value is read; anything after it is ignored.
        match serde_json::Deserializer::from_slice(&bytes)
            .into_iter::<T>()
            .next()
        {
            Some(Ok(value)) => Ok(JsonBody(value)),
            Some(Err(e)) => {
                tracing::error!(error = %e, "failed to decode request body");
                Err(AppError::InvalidRequestFormat)
            }
            None => {
                tracing::error!("request body is empty");
                Err(AppError::InvalidRequestFormat)
            }
        }
    }
}
