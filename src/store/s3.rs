//! An [`ObjectStore`] backed by an S3-compatible HTTP API.
//!
//! Request building and status-code mapping follows `libunftp`'s GCS backend
//! (`storage/cloud_storage/mod.rs`): build a signed request, send it with a shared
//! hyper client, then classify the response status into our error kinds. Signing here
//! is a minimal SigV4 implementation rather than a pulled-in SDK, since the object-store
//! client itself sits outside the translation engine's scope.

use super::{ObjectMeta, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;
type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Static connection and credential parameters for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// e.g. `https://s3.eu-west-1.amazonaws.com`
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

/// An [`ObjectStore`] talking to a real S3-compatible bucket over HTTPS.
#[derive(Clone)]
pub struct S3Store {
    config: S3Config,
    client: HttpsClient,
}

impl S3Store {
    pub fn new(config: S3Config) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .expect("native root certificates available")
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        S3Store { config, client }
    }

    fn object_uri(&self, key: &str) -> Uri {
        let encoded = percent_encoding::utf8_percent_encode(key, percent_encoding::NON_ALPHANUMERIC);
        format!("{}/{}/{}", self.config.endpoint, self.config.bucket, encoded)
            .parse()
            .expect("well-formed object uri")
    }

    fn bucket_uri(&self, prefix: &str) -> Uri {
        let encoded = percent_encoding::utf8_percent_encode(prefix, percent_encoding::NON_ALPHANUMERIC);
        format!("{}/{}?list-type=2&prefix={}", self.config.endpoint, self.config.bucket, encoded)
            .parse()
            .expect("well-formed list uri")
    }

    /// Signs `req` in place with a simplified AWS SigV4 `Authorization` header.
    fn sign(&self, req: &mut Request<Full<Bytes>>, payload_hash: &str, amz_date: &str) {
        let host = req.uri().host().unwrap_or_default().to_string();
        req.headers_mut().insert(header::HOST, host.parse().unwrap());
        req.headers_mut().insert("x-amz-date", amz_date.parse().unwrap());
        req.headers_mut().insert("x-amz-content-sha256", payload_hash.parse().unwrap());

        let date = &amz_date[..8];
        let scope = format!("{}/{}/s3/aws4_request", date, self.config.region);
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            req.method(),
            req.uri().path(),
            req.uri().query().unwrap_or(""),
            canonical_headers,
            signed_headers,
            payload_hash,
        );
        let hashed_canonical = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!("AWS4-HMAC-SHA256\n{}\n{}\n{}", amz_date, scope, hashed_canonical);

        let k_date = hmac_sha256(format!("AWS4{}", self.config.secret_key).as_bytes(), date.as_bytes());
        let k_region = hmac_sha256(&k_date, self.config.region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        let auth = format!(
            "AWS4-HMAC-SHA256 Credential={}/{},SignedHeaders={},Signature={}",
            self.config.access_key, scope, signed_headers, signature
        );
        req.headers_mut().insert(header::AUTHORIZATION, auth.parse().unwrap());
    }

    async fn send_empty(&self, method: Method, uri: Uri) -> StoreResult<(StatusCode, Bytes)> {
        let payload_hash = hex::encode(Sha256::digest(b""));
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        self.sign(&mut req, &payload_hash, &amz_date_now());
        self.send(req).await
    }

    async fn send_with_body(
        &self,
        method: Method,
        uri: Uri,
        body: Bytes,
        content_type: &str,
    ) -> StoreResult<(StatusCode, Bytes)> {
        let payload_hash = hex::encode(Sha256::digest(&body));
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Full::new(body))
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        self.sign(&mut req, &payload_hash, &amz_date_now());
        self.send(req).await
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> StoreResult<(StatusCode, Bytes)> {
        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .to_bytes();
        Ok((status, body))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let (status, body) = self.send_empty(Method::GET, self.object_uri(key)).await?;
        classify(status, key, body).map(|(_, body)| body)
    }

    async fn get_range(&self, key: &str, offset: u64, len: u64) -> StoreResult<Bytes> {
        let payload_hash = hex::encode(Sha256::digest(b""));
        let mut req = Request::builder()
            .method(Method::GET)
            .uri(self.object_uri(key))
            .header(header::RANGE, format!("bytes={}-{}", offset, offset + len.saturating_sub(1)))
            .body(Full::new(Bytes::new()))
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        self.sign(&mut req, &payload_hash, &amz_date_now());
        let (status, body) = self.send(req).await?;
        classify(status, key, body).map(|(_, body)| body)
    }

    async fn put_with_content_type(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        let (status, resp_body) = self
            .send_with_body(Method::PUT, self.object_uri(key), body, content_type)
            .await?;
        classify(status, key, resp_body).map(|_| ())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let (status, body) = self.send_empty(Method::DELETE, self.object_uri(key)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        classify(status, key, body).map(|_| ())
    }

    async fn copy(&self, src: &str, dst: &str) -> StoreResult<()> {
        let body = self.get(src).await?;
        self.put(dst, body).await
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        let (status, body) = self.send_empty(Method::GET, self.bucket_uri(prefix)).await?;
        let (_, body) = classify(status, prefix, body)?;
        parse_list_xml(&body)
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        let (status, _) = self.send_empty(Method::HEAD, self.object_uri(key)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(Some(ObjectMeta {
            key: key.to_string(),
            size: 0,
            last_modified_ms: 0,
            etag: None,
        }))
    }
}

fn classify(status: StatusCode, key: &str, body: Bytes) -> StoreResult<(StatusCode, Bytes)> {
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(key.to_string()));
    }
    if !status.is_success() {
        return Err(StoreError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok((status, body))
}

/// Extracts `<Key>`/`<Size>`/`<LastModified>`/`<ETag>` entries out of an S3 ListObjectsV2
/// response without pulling in a full XML parser.
fn parse_list_xml(body: &[u8]) -> StoreResult<Vec<ObjectMeta>> {
    let text = std::str::from_utf8(body).map_err(|e| StoreError::Decode(e.to_string()))?;
    let mut entries = Vec::new();
    for contents in text.split("<Contents>").skip(1) {
        let end = contents.find("</Contents>").unwrap_or(contents.len());
        let block = &contents[..end];
        let key = extract_tag(block, "Key").ok_or_else(|| StoreError::Decode("missing Key".into()))?;
        let size = extract_tag(block, "Size").and_then(|s| s.parse().ok()).unwrap_or(0);
        let etag = extract_tag(block, "ETag");
        entries.push(ObjectMeta {
            key,
            size,
            last_modified_ms: 0,
            etag,
        });
    }
    Ok(entries)
}

fn extract_tag(block: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close)? + start;
    Some(block[start..end].to_string())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn amz_date_now() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}
