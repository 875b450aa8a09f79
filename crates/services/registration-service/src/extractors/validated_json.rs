//! Validated JSON extractor.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use common::AppError;

/// JSON extractor that validates the payload before the handler runs.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::validation(first_message(&e)))?;

        Ok(ValidatedJson(value))
    }
}

/// First field error message, in field name order so the result is stable.
fn first_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    fields
        .into_iter()
        .filter_map(|field| field_errors.get(field))
        .filter_map(|errors| errors.first())
        .find_map(|error| error.message.as_ref())
        .map(|msg| msg.to_string())
        .unwrap_or_else(|| "Validation failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Probe {
        #[validate(email(message = "Please provide a valid email address"))]
        email: String,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_payload_passes() {
        let ValidatedJson(probe) =
            ValidatedJson::<Probe>::from_request(request(r#"{"email":"a@x.com"}"#), &())
                .await
                .unwrap();
        assert_eq!(probe.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_invalid_payload_reports_message() {
        let err = ValidatedJson::<Probe>::from_request(request(r#"{"email":"nope"}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Please provide a valid email address");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let err = ValidatedJson::<Probe>::from_request(request("{"), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
