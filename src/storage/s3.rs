use super::sigv4::{self, Credentials};
use super::{unsupported, Location, ObjectStore};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Method, StatusCode, Url};
use tracing::{debug, info, instrument};

/// S3-compatible object store using path-style addressing
/// (`{endpoint}/{bucket}/{key}`).
///
/// Requests are signed with SigV4 when credentials are present and sent
/// unsigned otherwise, which is what local emulators accept.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    credentials: Option<Credentials>,
}

impl S3Store {
    pub fn new(endpoint: Option<&str>, region: &str, credentials: Option<Credentials>) -> Self {
        let endpoint = match endpoint {
            Some(e) if !e.trim().is_empty() => e.trim().trim_end_matches('/').to_string(),
            _ => format!("https://s3.{}.amazonaws.com", region),
        };
        Self { client: reqwest::Client::new(), endpoint, region: region.to_string(), credentials }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, bucket: &str, key: Option<&str>) -> Result<Url> {
        let raw = match key {
            Some(key) => format!("{}/{}/{}", self.endpoint, bucket, sigv4::encode_key(key)),
            None => format!("{}/{}", self.endpoint, bucket),
        };
        Url::parse(&raw).map_err(|e| PipelineError::Config(format!("invalid S3 URL '{}': {}", raw, e)))
    }

    async fn send(&self, method: Method, url: Url, body: Bytes) -> Result<reqwest::Response> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(credentials) = &self.credentials {
            let payload_hash = sigv4::sha256_hex(&body);
            let headers = sigv4::sign(credentials, &self.region, method.as_str(), &url, &[], &payload_hash, Utc::now());
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }
        if !body.is_empty() {
            request = request.header(reqwest::header::CONTENT_TYPE, "application/octet-stream");
        }
        Ok(request.body(body).send().await?)
    }

    /// Creates the bucket; a bucket that already exists counts as success.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let url = self.url(bucket, None)?;
        let body = if self.region == "us-east-1" {
            Bytes::new()
        } else {
            Bytes::from(format!(
                "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                 <LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                self.region
            ))
        };
        let resp = self.send(Method::PUT, url.clone(), body).await?;
        let status = resp.status();
        if status.is_success() {
            info!(bucket, "Created bucket");
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT
            && (text.contains("BucketAlreadyOwnedByYou") || text.contains("BucketAlreadyExists"))
        {
            debug!(bucket, "Bucket already exists");
            return Ok(());
        }
        Err(PipelineError::Storage { url: url.to_string(), status: status.as_u16(), body: text })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, location: &Location) -> Result<Bytes> {
        let Location::S3 { bucket, key } = location else {
            return Err(unsupported("s3", "read", location));
        };
        let url = self.url(bucket, Some(key))?;
        let resp = self.send(Method::GET, url.clone(), Bytes::new()).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PipelineError::NotFound(location.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Storage { url: url.to_string(), status: status.as_u16(), body });
        }
        let bytes = resp.bytes().await?;
        debug!(location = %location, bytes = bytes.len(), "Fetched object");
        Ok(bytes)
    }

    async fn put(&self, location: &Location, bytes: Bytes) -> Result<()> {
        let Location::S3 { bucket, key } = location else {
            return Err(unsupported("s3", "write", location));
        };
        let url = self.url(bucket, Some(key))?;
        let size = bytes.len();
        let resp = self.send(Method::PUT, url.clone(), bytes).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Storage { url: url.to_string(), status: status.as_u16(), body });
        }
        debug!(location = %location, bytes = size, "Uploaded object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    // Reads one request (headers plus any Content-Length body) and answers with a canned response
    async fn respond(mut stream: TcpStream, status: &str, body: &str) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    /// Serves the same canned response to every connection; returns the endpoint URL.
    async fn stub_endpoint(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(respond(stream, status, body));
            }
        });
        format!("http://{}", addr)
    }

    fn object() -> Location {
        Location::S3 { bucket: "nyc-duration".into(), key: "fhv-2021-01-predictions.parquet".into() }
    }

    fn credentials() -> Option<Credentials> {
        Some(Credentials {
            access_key_id: "test".into(),
            secret_access_key: "test".into(),
            session_token: None,
        })
    }

    #[test]
    fn defaults_to_regional_aws_endpoint() {
        assert_eq!(S3Store::new(None, "eu-west-1", None).endpoint(), "https://s3.eu-west-1.amazonaws.com");
        assert_eq!(S3Store::new(Some(""), "us-east-1", None).endpoint(), "https://s3.us-east-1.amazonaws.com");
    }

    #[test]
    fn builds_path_style_urls() {
        let store = S3Store::new(Some("http://localhost:4566/"), "us-east-1", None);
        let url = store.url("nyc-duration", Some("dir/fhv 01.parquet")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4566/nyc-duration/dir/fhv%2001.parquet");
        assert_eq!(store.url("nyc-duration", None).unwrap().as_str(), "http://localhost:4566/nyc-duration");
    }

    #[tokio::test]
    async fn existing_bucket_counts_as_created() {
        let endpoint = stub_endpoint(
            "409 Conflict",
            "<Error><Code>BucketAlreadyOwnedByYou</Code><BucketName>nyc-duration</BucketName></Error>",
        )
        .await;
        let store = S3Store::new(Some(&endpoint), "eu-west-1", credentials());
        store.ensure_bucket("nyc-duration").await.unwrap();
    }

    #[tokio::test]
    async fn bucket_created_or_refused() {
        let ok = stub_endpoint("200 OK", "").await;
        S3Store::new(Some(&ok), "us-east-1", None).ensure_bucket("nyc-duration").await.unwrap();

        let denied = stub_endpoint("403 Forbidden", "<Error><Code>AccessDenied</Code></Error>").await;
        let err = S3Store::new(Some(&denied), "us-east-1", None).ensure_bucket("nyc-duration").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage { status: 403, ref body, .. } if body.contains("AccessDenied")));

        let other_conflict = stub_endpoint("409 Conflict", "<Error><Code>OperationAborted</Code></Error>").await;
        let err = S3Store::new(Some(&other_conflict), "us-east-1", None).ensure_bucket("b").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage { status: 409, .. }));
    }

    #[tokio::test]
    async fn get_maps_statuses() {
        let missing = stub_endpoint("404 Not Found", "<Error><Code>NoSuchKey</Code></Error>").await;
        let err = S3Store::new(Some(&missing), "us-east-1", credentials()).get(&object()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(ref loc) if loc == "s3://nyc-duration/fhv-2021-01-predictions.parquet"));

        let failing = stub_endpoint("500 Internal Server Error", "boom").await;
        let err = S3Store::new(Some(&failing), "us-east-1", None).get(&object()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage { status: 500, ref body, .. } if body == "boom"));

        let found = stub_endpoint("200 OK", "PAR1").await;
        let bytes = S3Store::new(Some(&found), "us-east-1", credentials()).get(&object()).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"PAR1"));
    }

    #[tokio::test]
    async fn put_maps_statuses() {
        let ok = stub_endpoint("200 OK", "").await;
        let store = S3Store::new(Some(&ok), "us-east-1", credentials());
        store.put(&object(), Bytes::from_static(b"payload")).await.unwrap();

        let denied = stub_endpoint("403 Forbidden", "<Error><Code>SignatureDoesNotMatch</Code></Error>").await;
        let err = S3Store::new(Some(&denied), "us-east-1", credentials())
            .put(&object(), Bytes::from_static(b"payload"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage { status: 403, .. }));

        let missing_bucket = stub_endpoint("404 Not Found", "<Error><Code>NoSuchBucket</Code></Error>").await;
        let err = S3Store::new(Some(&missing_bucket), "us-east-1", None)
            .put(&object(), Bytes::from_static(b"payload"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage { status: 404, .. }));
    }

    #[tokio::test]
    async fn other_locations_are_unsupported() {
        let store = S3Store::new(Some("http://127.0.0.1:9"), "us-east-1", None);
        let err = store.get(&Location::parse("out/x.parquet").unwrap()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Unsupported(_)));
    }
}
