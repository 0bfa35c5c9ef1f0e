//! JSON error bodies
//!
//! Every error response has the shape
//! `{"error": "<snake_code>", "message": "...", "fields": [...]}` where
//! `fields` appears for validation failures only.

use super::utils::{json_bytes, Resp};
use crate::Error;
use hyper::header::{HeaderValue, ALLOW};
use hyper::StatusCode;
use serde_json::json;

pub fn json_error(status: StatusCode, code: &str, message: &str) -> Resp {
    let body = json!({ "error": code, "message": message });
    json_bytes(status, body.to_string().into_bytes())
}

/// Map a core error onto a status and body
pub fn error_response(err: &Error) -> Resp {
    match err {
        Error::Validation { fields } => {
            let body = json!({
                "error": err.code(),
                "message": err.to_string(),
                "fields": fields,
            });
            json_bytes(StatusCode::BAD_REQUEST, body.to_string().into_bytes())
        }
        Error::NotFound { .. } => json_error(StatusCode::NOT_FOUND, err.code(), &err.to_string()),
        Error::Duplicate(_) => json_error(StatusCode::BAD_REQUEST, err.code(), &err.to_string()),
        Error::Dependency(detail) | Error::Config(detail) => {
            log::error!("Request failed: {}", detail);
            internal_error()
        }
    }
}

/// Collaborator details stay in the log, not in the body
pub fn internal_error() -> Resp {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
}

pub fn not_found(path: &str) -> Resp {
    json_error(StatusCode::NOT_FOUND, "not_found", &format!("No route for {}", path))
}

/// 405 with an Allow header
pub fn method_not_allowed(allowed: &'static str) -> Resp {
    let mut resp = json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        &format!("Allowed methods: {}", allowed),
    );
    resp.headers_mut().insert(ALLOW, HeaderValue::from_static(allowed));
    resp
}

pub fn bad_request(code: &str, message: &str) -> Resp {
    json_error(StatusCode::BAD_REQUEST, code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Resp) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let resp = error_response(&Error::validation(["name", "phoneNumber"]));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["fields"], json!(["name", "phoneNumber"]));
    }

    #[tokio::test]
    async fn test_dependency_hides_detail() {
        let resp = error_response(&Error::Dependency("disk on fire".to_string()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert!(!body["message"].as_str().unwrap().contains("disk"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(error_response(&Error::not_found("lead", "x")).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            error_response(&Error::Duplicate("same".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        let resp = method_not_allowed("GET, PATCH, DELETE");
        assert_eq!(resp.headers()[ALLOW], "GET, PATCH, DELETE");
    }
}
