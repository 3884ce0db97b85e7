//! `HttpProvider`, a JSON-RPC provider over HTTP.
//!
//! Talks to a node (or wallet bridge) that holds the user's accounts and
//! signs `eth_sendTransaction` itself. HTTP has no push channel, so
//! notifications are forwarded by the host through [`HttpProvider::emit`];
//! provider swaps are caught by the session watchdog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::RpcError;
use crate::provider::retry::{RetryConfig, RetryPolicy};
use crate::provider::{ProviderEvent, WalletProvider};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC client for an HTTP endpoint.
pub struct HttpProvider {
    url: String,
    client: Client,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
    retry_override: Option<RetryConfig>,
}

impl HttpProvider {
    pub fn new(url: &str) -> Self {
        let mut builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder
                .timeout(Duration::from_secs(30))
                .pool_max_idle_per_host(10);
        }
        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });
        let (events, _) = broadcast::channel(32);

        Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            next_id: AtomicU64::new(1),
            events,
            retry_override: None,
        }
    }

    /// Use `config` for every read-only request instead of the default
    /// idempotent policy. Writes still never retry.
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry_override = Some(config);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forward a wallet notification to session listeners.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn policy_for(&self, method: &str) -> RetryPolicy {
        match (RetryPolicy::for_method(method), &self.retry_override) {
            (RetryPolicy::Idempotent, Some(config)) => RetryPolicy::Custom(config.clone()),
            (policy, _) => policy,
        }
    }

    async fn request_with_retry(
        &self,
        method: &str,
        params: &Value,
        retry: RetryPolicy,
    ) -> Result<Value, RpcError> {
        let Some(config) = retry.config() else {
            return self.do_request(method, params).await;
        };

        let mut attempt = 0;
        loop {
            let err = match self.do_request(method, params).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !config.should_retry(&err) {
                return Err(err);
            }
            if attempt >= config.max_retries {
                return Err(RpcError::MaxRetriesExceeded {
                    attempts: attempt + 1,
                    last_error: err.to_string(),
                });
            }
            let delay = config.delay_for_attempt(attempt);
            tracing::debug!(
                method,
                attempt = attempt + 1,
                max = config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying JSON-RPC request"
            );
            futures_timer::Delay::new(delay).await;
            attempt += 1;
        }
    }

    async fn do_request(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(RpcError::ServerError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let envelope = resp.json::<JsonRpcResponse>().await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: JsonRpcResponse) -> Result<Value, RpcError> {
    match (envelope.error, envelope.result) {
        (Some(err), _) => Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        }),
        (None, Some(result)) => Ok(result),
        // `eth_getTransactionReceipt` legitimately answers `null`.
        (None, None) => Ok(Value::Null),
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.request_with_retry(method, &params, self.policy_for(method))
            .await
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
