// ABOUTME: Usage service client returning per-session token snapshots in session order

use crate::error::ServiceError;
use crate::models::UsageSample;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Returns one snapshot per running agent session, in slot order
pub trait UsageSource: Send + Sync {
    fn poll(&self) -> BoxFuture<'static, Result<Vec<UsageSample>, ServiceError>>;
}

/// `GET {server}/api/usage`
#[derive(Debug, Clone)]
pub struct HttpUsageSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpUsageSource {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let url = Url::parse(server_url)?.join("api/usage")?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl UsageSource for HttpUsageSource {
    fn poll(&self) -> BoxFuture<'static, Result<Vec<UsageSample>, ServiceError>> {
        let request = self.client.get(self.url.clone());
        async move {
            let body: Value = request.send().await?.error_for_status()?.json().await?;
            parse_usage_response(body)
        }
        .boxed()
    }
}

/// Accepts a bare list or `{"sessions": [...]}`
pub fn parse_usage_response(body: Value) -> Result<Vec<UsageSample>, ServiceError> {
    let list = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => map
            .remove("sessions")
            .ok_or_else(|| ServiceError::Malformed("missing 'sessions' list".to_string()))?,
        other => {
            return Err(ServiceError::Malformed(format!(
                "expected a list, got {}",
                other
            )))
        }
    };
    serde_json::from_value(list).map_err(|e| ServiceError::Malformed(e.to_string()))
}
