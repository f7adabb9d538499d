//! Request body extractor that deserializes and validates in one step.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::error::AppError;

/// JSON body checked with `validator` before the handler sees it.
///
/// Malformed JSON, a wrong content type and a shape mismatch all become
/// `400 BAD_REQUEST`; rule violations become `400 VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                debug!(reason = %rejection.body_text(), "Rejected request body");
                AppError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
            })?;

        value.validate()?;

        Ok(JsonBody(value))
    }
}

impl<T> std::ops::Deref for JsonBody<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
