//! Request token journal for the dev tools panel of the grid.
//!
//! Only wired in when dev tools are enabled. Every request gets a short token,
//! echoed back in the `X-Debug-Token` header, and the most recent tokens are
//! listed on the grid screen.

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const DEBUG_TOKEN_HEADER: &str = "x-debug-token";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestToken {
    pub token: String,
    pub method: String,
    pub path: String,
    pub at: DateTime<Utc>,
}

/// Bounded journal of recent request tokens.
#[derive(Debug)]
pub struct TokenFinder {
    capacity: usize,
    counter: AtomicU64,
    entries: Mutex<VecDeque<RequestToken>>,
}

impl TokenFinder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            counter: AtomicU64::new(0),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record a request and return its token. The oldest entry is evicted when full.
    pub fn record(&self, method: &str, path: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let at = Utc::now();
        let token = format!("{:x}{:04x}", at.timestamp_millis(), seq & 0xffff);

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(RequestToken {
            token: token.clone(),
            method: method.to_string(),
            path: path.to_string(),
            at,
        });

        token
    }

    /// Recorded tokens, most recent first.
    pub fn find(&self) -> Vec<RequestToken> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().cloned().collect()
    }
}

/// Middleware recording each request in the journal.
pub async fn record_request(
    State(finder): State<Arc<TokenFinder>>,
    req: Request,
    next: Next,
) -> Response {
    let token = finder.record(req.method().as_str(), req.uri().path());
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&token) {
        response.headers_mut().insert(DEBUG_TOKEN_HEADER, value);
    }
    response
}
