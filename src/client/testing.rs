//! Scripted transport for client tests.

use super::{
    Error,
    transport::{ApiRequest, ApiResponse, Transport},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::VecDeque, sync::Mutex};

/// Replies from a fixed script and records every request it sees. Each send
/// yields once first so concurrent callers interleave.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ApiResponse, Error>>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: impl IntoIterator<Item = Result<ApiResponse, Error>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.path)
            .collect()
    }
}

pub(crate) fn ok(body: Value) -> Result<ApiResponse, Error> {
    Ok(ApiResponse::with_body(200, body))
}

pub(crate) fn status(status: u16, body: Value) -> Result<ApiResponse, Error> {
    Ok(ApiResponse::with_body(status, body))
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        tokio::task::yield_now().await;
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request);
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| Err(Error::Network("script exhausted".to_string())))
    }
}
