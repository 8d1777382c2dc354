//! Arweave chain gateway client and wire types.
//!
//! The gateway speaks plain HTTP/JSON. All binary payloads on the wire
//! (transaction data, tag names, tag values) are base64 with the URL-safe
//! alphabet and padding stripped; [`base64_decode`] tolerates stray padding
//! because some gateways re-pad values on the way out.

use crate::utils::error::{IndexerError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A name/value pair attached to a transaction, both sides base64url-no-pad
/// encoded on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// A raw Arweave transaction as returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub owner: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub reward: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Transaction {
    /// Decodes all tags into `(name, value)` pairs.
    ///
    /// Dispatch decisions depend only on the decoded values.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Decoding` when a tag name or value is not
    /// valid base64url or not valid UTF-8.
    pub fn decoded_tags(&self) -> Result<Vec<(String, String)>> {
        self.tags
            .iter()
            .map(|tag| {
                let name = decode_utf8(&tag.name)?;
                let value = decode_utf8(&tag.value)?;
                Ok((name, value))
            })
            .collect()
    }
}

fn decode_utf8(input: &str) -> Result<String> {
    String::from_utf8(base64_decode(input)?)
        .map_err(|error| IndexerError::Decoding(format!("tag is not utf-8: {error}")))
}

/// An Arweave block header with the ids of its transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub txs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NetworkInfo {
    height: u64,
}

/// Decodes a base64url-no-pad payload.
///
/// Trailing padding is stripped before decoding; characters outside the
/// URL-safe alphabet are rejected.
pub fn base64_decode(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|error| IndexerError::Decoding(format!("base64 decode: {error}")))
}

/// Encodes a payload as base64url-no-pad.
#[must_use]
pub fn base64_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Derives the Arweave address of a transaction owner.
///
/// The address is the base64url-no-pad SHA-256 digest of the raw owner key
/// bytes.
pub fn owner_address(owner: &str) -> Result<String> {
    let key = base64_decode(owner)?;
    Ok(base64_encode(&Sha256::digest(key)))
}

/// HTTP client over a rotating list of Arweave gateway endpoints.
///
/// Each request walks the endpoint list in configured order and fails over
/// on transport errors; only when every endpoint has failed does the call
/// return an error.
#[derive(Debug, Clone)]
pub struct Client {
    endpoints: Vec<String>,
    http: reqwest::Client,
}

impl Client {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Config` when `endpoints` is empty, and
    /// `IndexerError::Internal` when the HTTP client cannot be built.
    pub fn new(endpoints: &[String]) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(IndexerError::Config(
                "at least one RPC endpoint is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| IndexerError::Internal(format!("build http client: {error}")))?;

        Ok(Self {
            endpoints: endpoints
                .iter()
                .map(|endpoint| endpoint.trim_end_matches('/').to_string())
                .collect(),
            http,
        })
    }

    /// Returns the current chain height.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Rpc` when every endpoint fails.
    pub async fn get_block_height(&self) -> Result<u64> {
        let info: NetworkInfo = self.get_json("info").await?;
        Ok(info.height)
    }

    /// Fetches a block header by height.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Rpc` when every endpoint fails.
    pub async fn get_block_by_height(&self, height: u64) -> Result<Block> {
        self.get_json(&format!("block/height/{height}")).await
    }

    /// Fetches a single transaction by id.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Rpc` when every endpoint fails.
    pub async fn get_transaction_by_id(&self, id: &str) -> Result<Transaction> {
        self.get_json(&format!("tx/{id}")).await
    }

    /// Fetches all transactions of a block, concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error; a block is indexed all-or-nothing.
    pub async fn get_transactions_by_block(&self, block: &Block) -> Result<Vec<Transaction>> {
        futures::future::try_join_all(
            block.txs.iter().map(|id| self.get_transaction_by_id(id)),
        )
        .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut last_error = String::new();

        for endpoint in &self.endpoints {
            let url = format!("{endpoint}/{path}");

            let response = match self.http.get(&url).send().await {
                Ok(response) => response,
                Err(error) => {
                    last_error = format!("{url}: {error}");
                    continue;
                }
            };

            let response = match response.error_for_status() {
                Ok(response) => response,
                Err(error) => {
                    last_error = format!("{url}: {error}");
                    continue;
                }
            };

            return response
                .json::<T>()
                .await
                .map_err(|error| IndexerError::Rpc(format!("{url}: decode response: {error}")));
        }

        Err(IndexerError::Rpc(format!(
            "all endpoints failed: {last_error}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Owner key and derived address of a real Paragraph transaction.
    const OWNER: &str = "rsfrA1_2H7Pb4kRtHj6EryEELG1sksd-1xGbAWJJqgCIJs9dQYL2C7afuCFX-pryKFpU3ZLssERyObt-BiDwWA3vSHAFljt0CbCBZRKqWKWeEXXdoBLR_Vf8724P14YqRubW7a0n6UaZKsJsxah35yPCANnw9QbnHJouTlNyky41ZnbBClRlYWr1_PkEMvFEsQcqIE5J8jcgJlaTNtiOi7ruvRP3z-NtqufuJFFq3_4hrL6ICpbJnZBgZuX33tr6YvCrYExtFmd8wJoL4s6MSioKYSWYk60ngr8EgUHotS1lzPemWRhY9wjbrg3wh00sCO44wv5CmE2Ke-EoKZYKrUu8g5z2MlPwOnNxBj67wzrSRzkpaVvbEWqneEwG_UcDxKU_SLeJ0_qGLNkQjgqjhfAAEdivsfV0Fz3hNRmVu2ae84QtoPQyvvcr2JLe-bTjbGvna_C52fR7-p9sp-MlZnL8vPnKfPZrTvfCOd935O2_CdiyzvOA35jQKQhe5UhqwH0hoYdplE2DHRN6MR42n-8nq3vqxp7Y34l-aUxnRIHBquMFbfH4KKn8N322_e_6nAwImjp_DziPhz5xOyQJgZOzCBTFuQrbaHkGbQ6ou814fyAUDJlA3S5-WKtsD8Jk1AMg0YmIdFUgCVUwwepoAgK1UPAxpq64GouKmnqjI58";
    const OWNER_ADDRESS: &str = "w5AtiFsNvORfcRtikbdrp2tzqixb05vdPw-ZhgVkD70";

    #[test]
    fn test_base64_decode_tag_names() {
        // Tag names and values as they appear on chain.
        assert_eq!(base64_decode("QXBwTmFtZQ").unwrap(), b"AppName");
        assert_eq!(base64_decode("UGFyYWdyYXBo").unwrap(), b"Paragraph");
        assert_eq!(base64_decode("UHVibGljYXRpb25TbHVn").unwrap(), b"PublicationSlug");
        assert_eq!(base64_decode("QHl1LXRlc3Q").unwrap(), b"@yu-test");
    }

    #[test]
    fn test_base64_decode_tolerates_padding() {
        assert_eq!(base64_decode("QXBwTmFtZQ==").unwrap(), b"AppName");
        assert_eq!(base64_decode("").unwrap(), b"");
    }

    #[test]
    fn test_base64_decode_rejects_invalid_alphabet() {
        assert!(base64_decode("a+b/c").is_err());
        assert!(base64_decode("not base64!").is_err());
    }

    #[test]
    fn test_owner_address_derivation() {
        assert_eq!(owner_address(OWNER).unwrap(), OWNER_ADDRESS);
    }

    #[test]
    fn test_client_requires_endpoints() {
        assert!(Client::new(&[]).is_err());
        assert!(Client::new(&["https://arweave.net".to_string()]).is_ok());
    }
}
