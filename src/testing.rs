//! In-memory upstream used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::upstream::client::{Upstream, UpstreamResponse, UpstreamTarget};
use crate::upstream::error::{ProxyError, ProxyResult};

type Reply = (StatusCode, HeaderMap, String);
type Handler = Box<dyn Fn() -> Reply + Send + Sync>;

/// Upstream answering from a fixed path → reply table and recording every
/// request. Unknown paths fail like a refused connection.
#[derive(Default)]
pub struct ScriptedUpstream {
    routes: HashMap<String, Handler>,
    requests: Mutex<Vec<UpstreamTarget>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn() -> Reply + Send + Sync + 'static,
    {
        self.routes.insert(path.to_string(), Box::new(f));
        self
    }

    pub fn requests(&self) -> Vec<UpstreamTarget> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().iter().map(|t| t.url.path().to_string()).collect()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, target: UpstreamTarget) -> ProxyResult<UpstreamResponse> {
        let path = target.url.path().to_string();
        self.requests.lock().unwrap().push(target);

        let Some(handler) = self.routes.get(&path) else {
            return Err(ProxyError::Transport("connection refused".to_string()));
        };
        let (status, headers, body) = handler();
        Ok(UpstreamResponse {
            status,
            headers,
            body: Body::from(body),
        })
    }
}

pub fn respond(status: u16, content_type: &str, body: &str) -> Reply {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
    (StatusCode::from_u16(status).unwrap(), headers, body.to_string())
}

pub fn html(status: u16, body: &str) -> Reply {
    respond(status, "text/html", body)
}

pub fn redirect(status: u16, location: &str) -> Reply {
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, HeaderValue::from_str(location).unwrap());
    (StatusCode::from_u16(status).unwrap(), headers, String::new())
}

pub async fn body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
