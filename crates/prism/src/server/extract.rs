//! JSON body extractor whose rejections use the 422 error envelope.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_json::Value;

use super::error::{ApiError, ValidationIssue};

/// Like `axum::Json`, but every rejection is a [`ApiError::Validation`].
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(&req) {
            return Err(ApiError::Validation(vec![ValidationIssue::new(
                vec![Value::from("body")],
                "Expected request with `Content-Type: application/json`",
                "content_type",
            )]));
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            ApiError::Validation(vec![ValidationIssue::new(
                vec![Value::from("body")],
                e.body_text(),
                "body_read",
            )])
        })?;

        serde_json::from_slice(&bytes)
            .map(ValidJson)
            .map_err(|e| ApiError::Validation(vec![issue_from_serde(&e)]))
    }
}

fn has_json_content_type(req: &Request) -> bool {
    let Some(value) = req.headers().get(CONTENT_TYPE) else {
        return false;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}

/// Map a serde_json failure to one validation issue.
fn issue_from_serde(err: &serde_json::Error) -> ValidationIssue {
    let message = err.to_string();
    match err.classify() {
        Category::Syntax | Category::Eof | Category::Io => ValidationIssue::new(
            vec![Value::from("body"), Value::from(err.column())],
            "JSON decode error",
            "json_invalid",
        ),
        Category::Data => match missing_field(&message) {
            Some(field) => ValidationIssue::new(
                vec![Value::from("body"), Value::from(field)],
                "Field required",
                "missing",
            ),
            None => ValidationIssue::new(vec![Value::from("body")], message, "type_error"),
        },
    }
}

/// Field name from serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Body {
        image_paths: Vec<String>,
    }

    fn issue(raw: &str) -> ValidationIssue {
        let err = serde_json::from_str::<Body>(raw).unwrap_err();
        issue_from_serde(&err)
    }

    #[test]
    fn test_missing_field() {
        let issue = issue("{}");
        assert_eq!(issue.kind, "missing");
        assert_eq!(issue.loc, vec![Value::from("body"), Value::from("image_paths")]);
    }

    #[test]
    fn test_wrong_type() {
        let issue = issue(r#"{"image_paths": "a.jpg"}"#);
        assert_eq!(issue.kind, "type_error");
        assert!(issue.msg.contains("invalid type"));
    }

    #[test]
    fn test_malformed_json() {
        let issue = issue(r#"{"image_paths": ["#);
        assert_eq!(issue.kind, "json_invalid");
        assert_eq!(issue.loc[0], Value::from("body"));
    }

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(
            missing_field("missing field `product_name` at line 1 column 2"),
            Some("product_name")
        );
        assert_eq!(missing_field("invalid type: null"), None);
    }
}
