use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use std::net::IpAddr;
use std::time::Instant;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new()).map_err(|never| match never {}).boxed()
}

/// Per-request context threaded through the pipeline (§3, §4.6).
pub struct RequestContext {
    pub uri_path: String,
    pub method: String,
    pub group_name: String,
    pub client_ip: Option<IpAddr>,
    pub start: Instant,
}

impl RequestContext {
    pub fn new(uri_path: String, method: String) -> Self {
        Self {
            uri_path,
            method,
            group_name: String::new(),
            client_ip: None,
            start: Instant::now(),
        }
    }
}
