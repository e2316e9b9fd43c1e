//! HTTP implementation of the catalog and status sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{Value, json};

use super::{ControllerError, DocumentStatus, IndexCatalog, IndexDescriptor, StatusSink};

/// Client for the controller API.
///
/// - `GET  {base}/api/indices` lists indices as `{"data": [{"name", "description"}]}`.
/// - `PUT  {base}/api/indices/{index}/documents/{filename}/status` records a status.
/// - `DELETE` on the same path clears it.
pub struct ControllerClient {
    client: Client,
    base_url: Url,
}

impl ControllerClient {
    /// Create a client for `base_url` with every request bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ControllerError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ControllerError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ControllerError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .user_agent("docrag/0.1")
            .timeout(timeout)
            .build()?;
        tracing::debug!(url = %base_url, ?timeout, "Initialized controller client");
        Ok(Self { client, base_url })
    }

    /// Append percent-encoded `segments` to the base URL path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ControllerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ControllerError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn status_endpoint(&self, index_name: &str, filename: &str) -> Result<Url, ControllerError> {
        self.endpoint(&["api", "indices", index_name, "documents", filename, "status"])
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        accepted: &[StatusCode],
    ) -> Result<reqwest::Response, ControllerError> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if accepted.contains(&status) {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ControllerError::UnexpectedStatus { status, body })
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> ControllerError {
    if error.is_timeout() {
        ControllerError::Timeout
    } else {
        ControllerError::Http(error)
    }
}

/// Extract descriptors from a catalog payload, skipping entries without a name.
fn parse_catalog(payload: &Value) -> Result<Vec<IndexDescriptor>, ControllerError> {
    let entries = match payload.get("data") {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(ControllerError::InvalidResponse(format!(
                "expected `data` array, found {other}"
            )));
        }
    };

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let description = entry
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(IndexDescriptor::new(name, description))
        })
        .collect())
}

#[async_trait]
impl IndexCatalog for ControllerClient {
    async fn list_indices(&self) -> Result<Vec<IndexDescriptor>, ControllerError> {
        let url = self.endpoint(&["api", "indices"])?;
        let response = self
            .send(Method::GET, url, None, &[StatusCode::OK])
            .await?;
        let payload: Value = response.json().await.map_err(map_transport_error)?;
        let indices = parse_catalog(&payload)?;
        tracing::debug!(count = indices.len(), "Fetched index catalog");
        Ok(indices)
    }
}

#[async_trait]
impl StatusSink for ControllerClient {
    async fn report(
        &self,
        index_name: &str,
        filename: &str,
        status: &DocumentStatus,
    ) -> Result<(), ControllerError> {
        let url = self.status_endpoint(index_name, filename)?;
        let body = json!({
            "status": status.as_str(),
            "error_msg": status.error_msg(),
        });
        self.send(
            Method::PUT,
            url,
            Some(body),
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, index_name: &str, filename: &str) -> Result<(), ControllerError> {
        let url = self.status_endpoint(index_name, filename)?;
        self.send(
            Method::DELETE,
            url,
            None,
            &[StatusCode::OK, StatusCode::NO_CONTENT, StatusCode::NOT_FOUND],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> ControllerClient {
        ControllerClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn lists_indices_and_skips_nameless_entries() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/indices");
                then.status(200).json_body(json!({
                    "data": [
                        {"name": "handbook", "description": "Employee handbook"},
                        {"name": "runbooks"},
                        {"description": "orphan"},
                        {"name": "faq", "description": null}
                    ],
                    "message": "ok",
                    "error": false
                }));
            })
            .await;

        let indices = client(&server).list_indices().await.unwrap();
        assert_eq!(
            indices,
            vec![
                IndexDescriptor::new("handbook", "Employee handbook"),
                IndexDescriptor::new("runbooks", ""),
                IndexDescriptor::new("faq", ""),
            ]
        );
    }

    #[tokio::test]
    async fn catalog_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/indices");
                then.status(503).body("unavailable");
            })
            .await;

        let error = client(&server).list_indices().await.unwrap_err();
        assert!(matches!(
            error,
            ControllerError::UnexpectedStatus { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn reports_failed_status_with_message() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/indices/docs/documents/q1-report.pdf/status")
                    .json_body(json!({"status": "failed", "error_msg": "Unsupported file type: .exe"}));
                then.status(204);
            })
            .await;

        client(&server)
            .report(
                "docs",
                "q1-report.pdf",
                &DocumentStatus::Failed("Unsupported file type: .exe".into()),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn clearing_missing_status_is_not_an_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/api/indices/docs/documents/gone.txt/status");
                then.status(404);
            })
            .await;

        client(&server).clear("docs", "gone.txt").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_status_update_surfaces_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/indices/docs/documents/a.txt/status");
                then.status(500);
            })
            .await;

        let result = client(&server)
            .report("docs", "a.txt", &DocumentStatus::Processing)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn missing_data_means_no_indices() {
        assert!(parse_catalog(&json!({"message": "none"})).unwrap().is_empty());
        assert!(parse_catalog(&json!({"data": "oops"})).is_err());
    }

    #[test]
    fn base_path_is_preserved() {
        let client =
            ControllerClient::new("http://controller:8083/prefix/", Duration::from_secs(1))
                .unwrap();
        let url = client.status_endpoint("idx", "dir/file.md").unwrap();
        assert_eq!(
            url.as_str(),
            "http://controller:8083/prefix/api/indices/idx/documents/dir%2Ffile.md/status"
        );
    }
}
