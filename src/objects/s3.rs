use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use time::OffsetDateTime;

use super::signing::{
    Credentials, EMPTY_PAYLOAD_SHA256, amz_date, authorization, uri_encode_segment,
};
use super::{ObjectStorage, ObjectStorageError};

/// Path-style S3 client (MinIO and compatible services) signing requests with SigV4.
pub struct S3ObjectStorage {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
}

impl S3ObjectStorage {
    /// Create a client for `endpoint` with every request bounded by `timeout`.
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ObjectStorageError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ObjectStorageError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if endpoint.host_str().is_none() {
            return Err(ObjectStorageError::InvalidEndpoint(endpoint.to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            credentials,
        })
    }

    /// Encoded request path `/<bucket>/<key segments>` below the endpoint's own path.
    fn object_path(&self, bucket: &str, key: &str) -> String {
        let mut path = self.endpoint.path().trim_end_matches('/').to_string();
        for segment in std::iter::once(bucket).chain(key.split('/')) {
            path.push('/');
            path.push_str(&uri_encode_segment(segment));
        }
        path
    }

    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError> {
        let path = self.object_path(bucket, key);
        let mut url = self.endpoint.clone();
        url.set_path(&path);

        let host = self.host_header();
        let date = amz_date(OffsetDateTime::now_utc());
        let auth = authorization(
            &self.credentials,
            "GET",
            &path,
            &[
                ("host", host.as_str()),
                ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256),
                ("x-amz-date", date.as_str()),
            ],
            EMPTY_PAYLOAD_SHA256,
            &date,
        )
        .map_err(|e| ObjectStorageError::Signing(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256)
            .header("x-amz-date", &date)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let bytes = response.bytes().await.map_err(map_transport_error)?;
                tracing::debug!(bucket, key, bytes = bytes.len(), "Fetched object");
                Ok(bytes.to_vec())
            }
            StatusCode::NOT_FOUND => Err(ObjectStorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ObjectStorageError::UnexpectedStatus { status, body })
            }
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> ObjectStorageError {
    if error.is_timeout() {
        ObjectStorageError::Timeout
    } else {
        ObjectStorageError::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn storage(base_url: &str, timeout: Duration) -> S3ObjectStorage {
        S3ObjectStorage::new(
            base_url,
            Credentials {
                access_key: "admin".into(),
                secret_key: "secret".into(),
                region: "us-east-1".into(),
            },
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_signed_path_style_object() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/docs/reports/q1.txt")
                    .header_exists("authorization")
                    .header_exists("x-amz-date")
                    .header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256);
                then.status(200).body("quarterly numbers");
            })
            .await;

        let bytes = storage(&server.base_url(), Duration::from_secs(5))
            .fetch("docs", "reports/q1.txt")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, b"quarterly numbers");
    }

    #[tokio::test]
    async fn missing_object_maps_to_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/docs/gone.txt");
                then.status(404).body("<Error><Code>NoSuchKey</Code></Error>");
            })
            .await;

        let error = storage(&server.base_url(), Duration::from_secs(5))
            .fetch("docs", "gone.txt")
            .await
            .unwrap_err();
        assert!(matches!(error, ObjectStorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn slow_storage_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/docs/slow.txt");
                then.status(200)
                    .body("late")
                    .delay(Duration::from_millis(500));
            })
            .await;

        let error = storage(&server.base_url(), Duration::from_millis(50))
            .fetch("docs", "slow.txt")
            .await
            .unwrap_err();
        assert!(matches!(error, ObjectStorageError::Timeout));
    }

    #[test]
    fn object_path_encodes_each_segment() {
        let storage = storage("http://localhost:9000", Duration::from_secs(1));
        assert_eq!(
            storage.object_path("docs", "team a/report v1.pdf"),
            "/docs/team%20a/report%20v1.pdf"
        );
        assert_eq!(storage.host_header(), "localhost:9000");
    }

    #[test]
    fn rejects_endpoint_without_host() {
        let result = S3ObjectStorage::new(
            "not-a-url",
            Credentials {
                access_key: String::new(),
                secret_key: String::new(),
                region: String::new(),
            },
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(ObjectStorageError::InvalidEndpoint(_))));
    }
}
