//! Generic REST binding: one resource path per table, `{ data, error }` bodies.

use super::{Backend, Filter};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::record::RecordId;
use crate::response::{Envelope, HealthStatus};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

pub struct RestClient {
    http: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.api_url.clone(), config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resource path: table lower-cased, id appended when targeting one record.
    fn path(table: &str, id: Option<&RecordId>) -> String {
        let table = table.trim_matches('/').to_lowercase();
        match id {
            Some(id) => format!("/{}/{}", table, id),
            None => format!("/{}", table),
        }
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn request(&self, method: Method, path: String, builder: RequestBuilder) -> Envelope<Value> {
        tracing::debug!(method = %method, path = %path, "request");
        match Self::send(builder).await {
            Ok(envelope) => {
                if let Some(e) = &envelope.error {
                    tracing::debug!(method = %method, path = %path, error = %e, "backend error");
                }
                envelope
            }
            Err(e) => {
                tracing::warn!(method = %method, path = %path, error = %e, "request failed");
                Envelope::err(e.to_string())
            }
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Envelope<Value>, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let json: Option<Value> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            let message = json
                .as_ref()
                .and_then(|j| j.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed ({})", status));
            return Ok(Envelope::err(message));
        }

        match json {
            None if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Envelope::empty()),
            None => Err(ClientError::Decode("response body is not JSON".into())),
            Some(Value::Object(obj)) if obj.contains_key("data") || obj.contains_key("error") => {
                serde_json::from_value(Value::Object(obj)).map_err(|e| ClientError::Decode(e.to_string()))
            }
            Some(_) => Err(ClientError::Decode("missing { data, error } envelope".into())),
        }
    }
}

fn query_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Backend for RestClient {
    fn binding(&self) -> &'static str {
        "rest"
    }

    async fn select(&self, table: &str, filter: Option<&Filter>) -> Envelope<Vec<Value>> {
        let path = Self::path(table, None);
        let mut builder = self.builder(Method::GET, &path);
        if let Some(f) = filter {
            builder = builder.query(&[(f.column.as_str(), query_value(&f.value))]);
        }
        let envelope = self.request(Method::GET, path, builder).await;
        match envelope.into_result() {
            Err(e) => Envelope::err(e),
            Ok(None) | Ok(Some(Value::Null)) => Envelope::empty(),
            Ok(Some(Value::Array(rows))) => Envelope::ok(rows),
            Ok(Some(_)) => Envelope::err(ClientError::Decode("expected a list in data".into()).to_string()),
        }
    }

    async fn insert(&self, table: &str, record: &Value) -> Envelope<Value> {
        let path = Self::path(table, None);
        let builder = self.builder(Method::POST, &path).json(record);
        self.request(Method::POST, path, builder).await
    }

    async fn update(&self, table: &str, id: &RecordId, patch: &Value) -> Envelope<Value> {
        let path = Self::path(table, Some(id));
        let builder = self.builder(Method::PUT, &path).json(patch);
        self.request(Method::PUT, path, builder).await
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Envelope<Value> {
        let path = Self::path(table, Some(id));
        let builder = self.builder(Method::DELETE, &path);
        self.request(Method::DELETE, path, builder).await
    }

    async fn health(&self) -> HealthStatus {
        let path = "/health".to_string();
        tracing::debug!(path = %path, "health check");
        let result = async {
            let response = self.builder(Method::GET, &path).send().await?;
            let status = response.status();
            let body: Value = response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            Ok::<_, ClientError>((status, body))
        }
        .await;
        match result {
            Ok((status, body)) => {
                let reported = body
                    .get("status")
                    .or_else(|| body.get("data").and_then(|d| d.get("status")))
                    .and_then(Value::as_str);
                if status.is_success() && reported == Some("healthy") {
                    HealthStatus::healthy()
                } else {
                    let message = body
                        .get("error")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("backend reported {:?} ({})", reported.unwrap_or("no status"), status));
                    HealthStatus::unhealthy(message)
                }
            }
            Err(e) => HealthStatus::unhealthy(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_lower_cases_table() {
        assert_eq!(RestClient::path("Bus_Lines", None), "/bus_lines");
        assert_eq!(RestClient::path("CITIES", Some(&RecordId::from(3))), "/cities/3");
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = RestClient::new("http://localhost:3001/api/", Duration::from_secs(1)).expect("client");
        assert_eq!(client.base_url(), "http://localhost:3001/api");
    }
}
