use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::ReadAt;
use anyhow::{Result, anyhow, bail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY: u32 = 10;

/// Remote archive fetched piecewise with HTTP Range requests.
///
/// Only the byte ranges the ZIP reader asks for are transferred: the
/// central directory at the tail plus the bundle members being copied.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    /// Probe `url` with a HEAD request.
    ///
    /// Fails unless the server answers successfully, advertises
    /// `Accept-Ranges: bytes` and reports a `Content-Length`.
    pub async fn new(url: String) -> Result<Self> {
        Self::with_timeout(url, REQUEST_TIMEOUT).await
    }

    /// Like [`new`](Self::new), with a per-request timeout. A timed out
    /// range request is retried.
    pub async fn with_timeout(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let resp = client.head(&url).send().await?;
        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        let accept_ranges = resp
            .headers()
            .get(reqwest::header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            bail!("Remote server does not support Range requests");
        }

        let size = resp
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        debug!("remote archive {} is {} bytes", url, size);

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Bytes of member or directory data received so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let wanted = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retries = 0;

        while received < wanted {
            let start = offset + received as u64;
            let result = self
                .client
                .get(&self.url)
                .header(reqwest::header::RANGE, format!("bytes={}-{}", start, end))
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        bail!("HTTP request failed with status: {}", resp.status());
                    }

                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        bail!("Server returned an empty range for bytes={}-{}", start, end);
                    }
                    let chunk_len = bytes.len().min(wanted - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;

                    let total = self
                        .transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed)
                        + chunk_len as u64;
                    debug!(
                        "fetched {} bytes at offset {}, {} transferred so far",
                        chunk_len, start, total
                    );
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retries += 1;
                    if retries >= MAX_RETRY {
                        bail!("Max retries exceeded fetching {}", self.url);
                    }
                    warn!("connection error, retry {}/{}: {}", retries, MAX_RETRY, e);
                    tokio::time::sleep(Duration::from_millis(500 * retries as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
