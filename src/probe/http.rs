//! HTTP GET probe.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::probe::{Probe, ProbeFailure};

const USER_AGENT: &str = concat!("ingress-challenge/", env!("CARGO_PKG_VERSION"));

/// Probe that succeeds on an HTTP 200 answer.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, url: &Uri) -> Result<(), ProbeFailure> {
        let request = Request::builder()
            .method("GET")
            .uri(url.clone())
            .header("user-agent", USER_AGENT)
            .body(Body::empty())
            .map_err(|e| ProbeFailure::Transport(format!("building request: {}", e)))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeFailure::Transport(e.to_string()))?;

        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeFailure::Status(response.status().as_u16()))
        }
    }
}
