//! Test doubles shared by the core unit tests

use super::executor::Method;
use crate::adapters::kintone::{Endpoint, Transport};
use crate::domain::{Query, Result, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Fails the first `failures` calls with a transport error, then answers from
/// the queued bodies in order and with `response` once the queue is empty.
pub(crate) struct ScriptedTransport {
    failures: Mutex<u32>,
    queued: Mutex<VecDeque<Value>>,
    response: Value,
    pub(crate) calls: Mutex<Vec<(Method, Value)>>,
    pub(crate) endpoints: Mutex<Vec<Endpoint>>,
}

impl ScriptedTransport {
    pub(crate) fn new(failures: u32, response: Value) -> Arc<Self> {
        Self::queued(failures, Vec::new(), response)
    }

    pub(crate) fn queued(failures: u32, queued: Vec<Value>, response: Value) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(failures),
            queued: Mutex::new(queued.into()),
            response,
            calls: Mutex::new(Vec::new()),
            endpoints: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn methods(&self) -> Vec<Method> {
        self.calls.lock().unwrap().iter().map(|(m, _)| *m).collect()
    }

    fn answer(&self, method: Method, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push((method, body.clone()));
        self.endpoints.lock().unwrap().push(endpoint);
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(TransportError::ConnectionFailed("reset".to_string()).into());
        }
        let body = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.response.clone());
        Ok(serde_json::to_vec(&body).unwrap())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, endpoint: Endpoint, query: &Query) -> Result<Vec<u8>> {
        self.answer(Method::Get, endpoint, &query.to_body())
    }
    async fn get_with_body(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.answer(Method::Get, endpoint, body)
    }
    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.answer(Method::Post, endpoint, body)
    }
    async fn put(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.answer(Method::Put, endpoint, body)
    }
    async fn delete(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<u8>> {
        self.answer(Method::Delete, endpoint, body)
    }
}
