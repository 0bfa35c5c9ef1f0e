//! Response plumbing shared by the handlers

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;

pub type RespBody = BoxBody<Bytes, Infallible>;
pub type Resp = Response<RespBody>;

pub fn body_from<T: Into<Bytes>>(data: T) -> RespBody {
    Full::new(data.into()).boxed()
}

/// Raw JSON bytes with a status
pub fn json_bytes(status: StatusCode, body: Vec<u8>) -> Resp {
    let mut resp = Response::new(body_from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

/// Serialize `value`; a serialization failure becomes a 500
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Resp {
    match serde_json::to_vec(value) {
        Ok(body) => json_bytes(status, body),
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            super::error::internal_error()
        }
    }
}

pub fn ok<T: Serialize>(value: &T) -> Resp {
    json_response(StatusCode::OK, value)
}

pub fn created<T: Serialize>(value: &T) -> Resp {
    json_response(StatusCode::CREATED, value)
}
