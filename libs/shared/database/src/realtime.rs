use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method,
};
use serde_json::{Map, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::StoreError;
use crate::store::{segments, HierarchicalStore};

/// REST client for the managed realtime database. Every node is reachable at
/// `{base_url}/{path}.json`.
pub struct RealtimeDbClient {
    client: Client,
    base_url: String,
    secret: String,
}

impl RealtimeDbClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.database_url, &config.database_secret)
    }

    pub fn with_base_url(base_url: &str, secret: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn node_url(&self, path: &str) -> Result<String, StoreError> {
        let encoded: Vec<String> = segments(path)?
            .into_iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        Ok(format!("{}/{}.json", self.base_url, encoded.join("/")))
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, StoreError> {
        let url = self.node_url(path)?;
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers());

        if !self.secret.is_empty() {
            req = req.query(&[("auth", self.secret.as_str())]);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => StoreError::Unauthorized(error_text),
                code => StoreError::Status { status: code, body: error_text },
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl HierarchicalStore for RealtimeDbClient {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        if value.is_null() {
            self.request(Method::DELETE, path, None).await?;
        } else {
            self.request(Method::PUT, path, Some(value)).await?;
        }
        Ok(())
    }

    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<(), StoreError> {
        for key in values.keys() {
            segments(key)?;
        }
        self.request(Method::PATCH, path, Some(Value::Object(values))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_read_returns_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u1.json"))
            .and(query_param("auth", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
            .mount(&server)
            .await;

        let client = RealtimeDbClient::with_base_url(&server.uri(), "secret");
        let snapshot = client.read("users/u1").await.unwrap();

        assert_eq!(snapshot, Some(json!({"name": "Ada"})));
    }

    #[tokio::test]
    async fn test_read_missing_node_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/missing.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = RealtimeDbClient::with_base_url(&server.uri(), "");
        assert_eq!(client.read("users/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multi_path_update_is_one_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/.json"))
            .and(body_json(json!({"appointments/doc/p1/a1": {"Status": "Pending"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = RealtimeDbClient::with_base_url(&server.uri(), "");
        let mut updates = Map::new();
        updates.insert("appointments/doc/p1/a1".to_string(), json!({"Status": "Pending"}));

        client.update("", updates).await.unwrap();
    }

    #[tokio::test]
    async fn test_permission_denied_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let client = RealtimeDbClient::with_base_url(&server.uri(), "bad");
        let result = client.read("doctors").await;

        assert_matches!(result, Err(StoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_invalid_key_never_reaches_network() {
        let client = RealtimeDbClient::with_base_url("http://127.0.0.1:9", "");
        let result = client.read("doctors/jane@clinic.com").await;

        assert_matches!(result, Err(StoreError::InvalidPath(_)));
    }
}
