//! Test doubles shared by the unit tests and, behind the `test-util`
//! feature, the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

use crate::network::transport::{JsonResponse, JsonTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

type Script = Result<JsonResponse, String>;

/// Transport answering from canned responses keyed by method and URL.
/// Unscripted requests fail as unreachable. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<(Method, String), Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: Method, url: impl Into<String>, script: Script) {
        self.scripts.lock().insert((method, url.into()), script);
    }

    pub fn on_get(&self, url: impl Into<String>, response: JsonResponse) {
        self.script(Method::Get, url, Ok(response));
    }

    pub fn on_post(&self, url: impl Into<String>, response: JsonResponse) {
        self.script(Method::Post, url, Ok(response));
    }

    pub fn fail_get(&self, url: impl Into<String>, reason: &str) {
        self.script(Method::Get, url, Err(reason.to_string()));
    }

    pub fn fail_post(&self, url: impl Into<String>, reason: &str) {
        self.script(Method::Post, url, Err(reason.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn gets_of(&self, url: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == Method::Get && c.url == url)
            .count()
    }

    pub fn posts_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == Method::Post && c.url == url)
            .cloned()
            .collect()
    }

    fn answer(&self, method: Method, url: &str) -> Result<JsonResponse, TransportError> {
        match self.scripts.lock().get(&(method, url.to_string())) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(reason)) => Err(TransportError::unreachable(url, reason.clone())),
            None => Err(TransportError::unreachable(url, "no scripted response")),
        }
    }
}

#[async_trait]
impl JsonTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<JsonResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: Method::Get,
            url: url.to_string(),
            body: None,
            bearer: None,
        });
        self.answer(Method::Get, url)
    }

    async fn post(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<JsonResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: Method::Post,
            url: url.to_string(),
            body: Some(body.clone()),
            bearer: bearer.map(str::to_string),
        });
        self.answer(Method::Post, url)
    }
}
