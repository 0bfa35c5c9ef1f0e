//! Route table and handlers
//!
//! Handlers stay thin: extract identity and payload, call one
//! [`LeadService`] operation, serialize the result.

use super::error::{bad_request, error_response, method_not_allowed, not_found};
use super::request::{identity_from_headers, window_from_query};
use super::utils::{created, ok, Resp};
use crate::model::{LeadUpdate, NewEmail, NewLead, NewUser};
use crate::service::LeadService;
use bytes::Bytes;
use hyper::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::json;

/// What the router needs from a request once the body has been read
pub struct Incoming<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub body: Bytes,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Resp> {
    serde_json::from_slice(body)
        .map_err(|e| bad_request("invalid_json", &format!("Request body is not valid JSON: {}", e)))
}

/// Unwrap a service result or render its error
macro_rules! try_service {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return error_response(&err),
        }
    };
}

macro_rules! try_body {
    ($body:expr) => {
        match parse_body($body) {
            Ok(value) => value,
            Err(resp) => return resp,
        }
    };
}

pub async fn route(service: &LeadService, req: Incoming<'_>) -> Resp {
    let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["health"] => match *req.method {
            Method::GET => ok(&json!({ "status": "ok" })),
            _ => method_not_allowed("GET"),
        },
        ["api", "leads"] => match *req.method {
            Method::POST => create_lead(service, &req).await,
            _ => method_not_allowed("POST"),
        },
        ["api", "leads", "working-set"] => match *req.method {
            Method::GET => working_set(service, &req).await,
            _ => method_not_allowed("GET"),
        },
        ["api", "leads", id] => match *req.method {
            Method::GET => ok(&try_service!(service.get_lead(id).await)),
            Method::PATCH => update_lead(service, &req, id).await,
            Method::DELETE => {
                let actor = try_service!(identity_from_headers(req.headers));
                ok(&try_service!(service.delete_lead(&actor, id).await))
            }
            _ => method_not_allowed("GET, PATCH, DELETE"),
        },
        ["api", "inventory"] => match *req.method {
            Method::GET => {
                let window = try_service!(window_from_query(req.query));
                ok(&try_service!(service.recompute_inventory(window).await))
            }
            _ => method_not_allowed("GET"),
        },
        ["api", "performance", "lead-generators"] => match *req.method {
            Method::GET => ok(&try_service!(service.recompute_agent_performance().await)),
            _ => method_not_allowed("GET"),
        },
        ["api", "performance", "telemarketers"] => match *req.method {
            Method::GET => ok(&try_service!(service.recompute_telemarketer_performance().await)),
            _ => method_not_allowed("GET"),
        },
        ["api", "bookings"] => match *req.method {
            Method::GET => ok(&try_service!(service.list_bookings().await)),
            _ => method_not_allowed("GET"),
        },
        ["api", "notifications"] => match *req.method {
            Method::GET => ok(&try_service!(service.list_notifications().await)),
            _ => method_not_allowed("GET"),
        },
        ["api", "users"] => match *req.method {
            Method::POST => {
                let request: NewUser = try_body!(&req.body);
                created(&try_service!(service.register_user(request).await))
            }
            _ => method_not_allowed("POST"),
        },
        ["api", "emails"] => match *req.method {
            Method::POST => {
                let request: NewEmail = try_body!(&req.body);
                created(&try_service!(service.log_email(request).await))
            }
            _ => method_not_allowed("POST"),
        },
        _ => not_found(req.path),
    }
}

async fn working_set(service: &LeadService, req: &Incoming<'_>) -> Resp {
    let agent = try_service!(identity_from_headers(req.headers));
    ok(&try_service!(service.get_working_set(&agent.id).await))
}

async fn create_lead(service: &LeadService, req: &Incoming<'_>) -> Resp {
    let actor = try_service!(identity_from_headers(req.headers));
    let request: NewLead = try_body!(&req.body);
    created(&try_service!(service.create_lead(&actor, request).await))
}

async fn update_lead(service: &LeadService, req: &Incoming<'_>, id: &str) -> Resp {
    let actor = try_service!(identity_from_headers(req.headers));
    let update: LeadUpdate = try_body!(&req.body);
    ok(&try_service!(service.update_lead(&actor, id, update).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::LeadType;
    use crate::testing::{sample_request, Harness};
    use http_body_util::BodyExt;
    use hyper::header::HeaderValue;
    use hyper::StatusCode;
    use serde_json::Value;

    fn telemarketer_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-agent-id", HeaderValue::from_static("tm-1"));
        headers.insert("x-agent-name", HeaderValue::from_static("Robin"));
        headers.insert("x-agent-role", HeaderValue::from_static("Telemarketer"));
        headers.insert("x-agent-team", HeaderValue::from_static("Alpha"));
        headers
    }

    async fn call(
        service: &LeadService,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Value,
    ) -> (StatusCode, Value) {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        let body = if body.is_null() { Bytes::new() } else { Bytes::from(body.to_string()) };
        let resp = route(service, Incoming { method: &method, path, query, headers, body }).await;
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let harness = Harness::new();
        let headers = HeaderMap::new();
        let (status, body) = call(&harness.service, Method::GET, "/health", &headers, Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, _) = call(&harness.service, Method::GET, "/api/nope", &headers, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&harness.service, Method::PUT, "/api/leads", &headers, Value::Null).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_create_then_fetch_lead() {
        let harness = Harness::new();
        let headers = telemarketer_headers();
        let request = serde_json::to_value(sample_request("Old Mill Bakery", LeadType::Bakery)).unwrap();

        let (status, lead) =
            call(&harness.service, Method::POST, "/api/leads", &headers, request.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = lead["id"].as_str().unwrap().to_string();

        let (status, fetched) =
            call(&harness.service, Method::GET, &format!("/api/leads/{}", id), &headers, Value::Null)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Old Mill Bakery");

        let (status, body) = call(&harness.service, Method::POST, "/api/leads", &headers, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "duplicate");
    }

    #[tokio::test]
    async fn test_invalid_lead_lists_fields() {
        let harness = Harness::new();
        let (status, body) = call(
            &harness.service,
            Method::POST,
            "/api/leads",
            &telemarketer_headers(),
            json!({ "name": "Nameless", "type": "Spaceport" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> =
            body["fields"].as_array().unwrap().iter().filter_map(|f| f.as_str()).collect();
        assert!(fields.contains(&"type"));
        assert!(fields.contains(&"phoneNumber"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let harness = Harness::new();
        let resp = route(
            &harness.service,
            Incoming {
                method: &Method::POST,
                path: "/api/emails",
                query: None,
                headers: &HeaderMap::new(),
                body: Bytes::from_static(b"{not json"),
            },
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_working_set_requires_identity() {
        let harness = Harness::new();
        harness.seed_unassigned(LeadType::Restaurant, 3).await;

        let (status, _) = call(
            &harness.service,
            Method::GET,
            "/api/leads/working-set",
            &HeaderMap::new(),
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, leads) = call(
            &harness.service,
            Method::GET,
            "/api/leads/working-set",
            &telemarketer_headers(),
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(leads.as_array().unwrap().len(), 3);
        assert!(leads.as_array().unwrap().iter().all(|l| l["assignedTo"] == "tm-1"));
    }

    #[tokio::test]
    async fn test_inventory_with_window() {
        let harness = Harness::new();
        harness.seed_unassigned(LeadType::Gym, 2).await;

        let (status, snapshot) =
            call(&harness.service, Method::GET, "/api/inventory", &HeaderMap::new(), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["totalLeads"], 2);
        assert_eq!(snapshot["leadsByType"]["Gym"], 2);

        let (status, snapshot) = call(
            &harness.service,
            Method::GET,
            "/api/inventory?start=2020-01-01T00:00:00Z&end=2020-12-31T00:00:00Z",
            &HeaderMap::new(),
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["totalLeads"], 0);

        let (status, _) = call(
            &harness.service,
            Method::GET,
            "/api/inventory?end=2020-12-31T00:00:00Z",
            &HeaderMap::new(),
            Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
