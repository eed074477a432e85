//! [`ProviderClientFactory`] for REST providers configured under `[providers]`.

use super::client::ProviderHttpClient;
use crate::config::{FileProviderEndpoint, FileProvidersConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use toolgate_application::{ClientFactoryError, CredentialLease, ProviderClientFactory};
use toolgate_domain::normalize_namespace;
use tracing::debug;

pub struct HttpClientFactory {
    endpoints: HashMap<String, FileProviderEndpoint>,
}

impl HttpClientFactory {
    pub fn new(endpoints: &FileProvidersConfig) -> Self {
        Self {
            endpoints: endpoints
                .iter()
                .map(|(provider, endpoint)| (normalize_namespace(provider), endpoint.clone()))
                .collect(),
        }
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

#[async_trait]
impl ProviderClientFactory for HttpClientFactory {
    type Client = ProviderHttpClient;

    async fn create_client(
        &self,
        provider: &str,
        lease: Arc<CredentialLease>,
    ) -> Result<ProviderHttpClient, ClientFactoryError> {
        let namespace = normalize_namespace(provider);
        let endpoint = self
            .endpoints
            .get(&namespace)
            .ok_or_else(|| ClientFactoryError::UnsupportedProvider(provider.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.request_timeout_seconds))
            .build()
            .map_err(|e| ClientFactoryError::Construction(e.to_string()))?;

        debug!(provider = %namespace, base_url = %endpoint.base_url, "Building provider HTTP client");
        Ok(ProviderHttpClient::new(
            http,
            namespace,
            endpoint.base_url.clone(),
            endpoint.headers.clone(),
            lease,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use toolgate_domain::{ConnectionId, Credentials};

    /// Answer `count` requests with `{"ok":true}` and return their raw text.
    async fn serve(count: usize) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for _ in 0..count {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap();
                requests.push(String::from_utf8_lossy(&buf[..n]).to_string());
                let body = r#"{"ok":true}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
            requests
        });
        (base_url, handle)
    }

    fn factory(base_url: &str) -> HttpClientFactory {
        let mut endpoints = FileProvidersConfig::new();
        endpoints.insert(
            "Notion".to_string(),
            FileProviderEndpoint {
                base_url: base_url.to_string(),
                headers: HashMap::from([("Notion-Version".to_string(), "2022-06-28".to_string())]),
                request_timeout_seconds: 5,
            },
        );
        HttpClientFactory::new(&endpoints)
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unsupported() {
        let result = factory("http://127.0.0.1:9")
            .create_client("github", Arc::new(CredentialLease::anonymous("github")))
            .await;
        assert!(matches!(result, Err(ClientFactoryError::UnsupportedProvider(_))));
    }

    #[tokio::test]
    async fn test_requests_use_current_lease_token() {
        let (base_url, server) = serve(2).await;
        let lease = Arc::new(CredentialLease::new(
            Some(ConnectionId::new("conn-1")),
            "notion",
            Some(Credentials::oauth("token-1")),
        ));
        let client = factory(&base_url)
            .create_client("notion", Arc::clone(&lease))
            .await
            .unwrap();

        let first = client.get_json("/pages").await.unwrap();
        assert_eq!(first, serde_json::json!({"ok": true}));

        lease.replace(Credentials::oauth("token-2"));
        client
            .post_json("search", &serde_json::json!({"query": "tasks"}))
            .await
            .unwrap();

        let requests = server.await.unwrap();
        let first = requests[0].to_ascii_lowercase();
        assert!(requests[0].starts_with("GET /v1/pages"));
        assert!(first.contains("authorization: bearer token-1"));
        assert!(first.contains("notion-version: 2022-06-28"));
        assert!(requests[1].starts_with("POST /v1/search"));
        assert!(requests[1].to_ascii_lowercase().contains("authorization: bearer token-2"));
    }
}
