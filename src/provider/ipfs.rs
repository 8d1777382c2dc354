//! IPFS gateway client with MIME sniffing.
//!
//! Content-addressed blobs are fetched over plain HTTP from a configured
//! list of gateways. There is no per-gateway retry: a transport error falls
//! through to the next gateway, and only when the list is exhausted does
//! the fetch fail.

use crate::utils::error::{IndexerError, Result};
use crate::utils::logging::{self, LogLevel};
use std::time::Duration;

/// Number of leading bytes read in quick mode, enough for MIME sniffing.
const SNIFF_LEN: usize = 3072;

/// How much of the blob a fetch reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Read only enough leading bytes to sniff the MIME type.
    Quick,
    /// Read the whole blob.
    Full,
}

/// HTTP client over a rotating list of IPFS gateways.
#[derive(Debug, Clone)]
pub struct HttpClient {
    gateways: Vec<String>,
    http: reqwest::Client,
}

impl HttpClient {
    /// Creates a new client with the given gateways and per-fetch deadline.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` when `gateways` is empty, and
    /// `IndexerError::Internal` when the HTTP client cannot be built.
    pub fn new(gateways: &[String], timeout: Duration) -> Result<Self> {
        if gateways.is_empty() {
            return Err(IndexerError::Config(
                "at least one IPFS gateway is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| IndexerError::Internal(format!("build http client: {error}")))?;

        Ok(Self {
            gateways: gateways
                .iter()
                .map(|gateway| gateway.trim_end_matches('/').to_string())
                .collect(),
            http,
        })
    }

    /// Fetches a blob by CID or `/ipfs/` path.
    ///
    /// Gateways are tried in configured order; the first success wins.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::IpfsUnavailable` when every gateway fails.
    pub async fn fetch(&self, path: &str, mode: FetchMode) -> Result<Vec<u8>> {
        let cid = path
            .trim_start_matches("ipfs://")
            .trim_start_matches("/ipfs/")
            .trim_start_matches('/');

        let mut last_error = String::new();

        for gateway in &self.gateways {
            let url = format!("{gateway}/ipfs/{cid}");

            match self.fetch_one(&url, mode).await {
                Ok(bytes) => return Ok(bytes),
                Err(error) => {
                    logging::log(LogLevel::Warning, &format!("ipfs gateway failed: {error}"));
                    last_error = error;
                }
            }
        }

        Err(IndexerError::IpfsUnavailable(format!(
            "all gateways failed for {cid}: {last_error}"
        )))
    }

    async fn fetch_one(&self, url: &str, mode: FetchMode) -> std::result::Result<Vec<u8>, String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| format!("{url}: {error}"))?;

        match mode {
            FetchMode::Full => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|error| format!("{url}: {error}"))?;
                Ok(bytes.to_vec())
            }
            FetchMode::Quick => {
                let mut response = response;
                let mut buffer = Vec::with_capacity(SNIFF_LEN);

                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|error| format!("{url}: {error}"))?
                {
                    buffer.extend_from_slice(&chunk);
                    if buffer.len() >= SNIFF_LEN {
                        break;
                    }
                }

                Ok(buffer)
            }
        }
    }
}

/// Sniffs a MIME type from the leading bytes of a blob.
///
/// Recognizes the media formats that show up in publishing-platform posts;
/// anything else is reported as `application/octet-stream`.
#[must_use]
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }

    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return "image/png";
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }

    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }

    // SVG is text; skip whitespace and an optional XML declaration.
    if let Ok(text) = std::str::from_utf8(&data[..data.len().min(SNIFF_LEN)]) {
        let trimmed = text.trim_start();
        if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg"))
        {
            return "image/svg+xml";
        }
    }

    "application/octet-stream"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(
            sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
            "image/png"
        );
        assert_eq!(sniff_mime(b"GIF89a..."), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff_mime(b"<svg xmlns=\"a\">"), "image/svg+xml");
        assert_eq!(
            sniff_mime(b"<?xml version=\"1.0\"?>\n<svg>"),
            "image/svg+xml"
        );
    }

    #[test]
    fn test_sniff_unknown_format() {
        assert_eq!(sniff_mime(b"hello world"), "application/octet-stream");
        assert_eq!(sniff_mime(&[]), "application/octet-stream");
    }

    #[test]
    fn test_client_requires_gateways() {
        assert!(HttpClient::new(&[], Duration::from_secs(5)).is_err());
        assert!(
            HttpClient::new(&["https://ipfs.io/".to_string()], Duration::from_secs(5)).is_ok()
        );
    }
}
