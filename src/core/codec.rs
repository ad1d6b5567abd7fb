//! Share tokens: a configuration serialized to JSON, DEFLATE-compressed and
//! written as unpadded URL-safe base64 so it fits in a query parameter.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use thiserror::Error;
use tracing::debug;

use super::config::{BillConfig, PortableConfig};

/// Query parameter that carries a share token.
pub const SHARE_PARAM: &str = "state";

const MAX_INFLATED_BYTES: u64 = 1 << 20;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("share token is empty")]
    Empty,
    #[error("share token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share token could not be inflated: {0}")]
    Inflate(#[from] std::io::Error),
    #[error("share token expands beyond 1 MiB")]
    TooLarge,
    #[error("share token does not hold a bill configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode(config: &BillConfig) -> Result<String, CodecError> {
    encode_portable(&config.to_portable())
}

pub fn encode_portable(portable: &PortableConfig) -> Result<String, CodecError> {
    let json = serde_json::to_vec(portable)?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Decodes a token into a configuration with fresh identifiers.
pub fn decode(token: &str) -> Result<BillConfig, CodecError> {
    let json = inflate_token(token)?;
    let portable: PortableConfig = serde_json::from_slice(&json)?;
    Ok(BillConfig::from_portable(portable))
}

/// Decodes an optional token, falling back to the default configuration
/// when it is absent or unreadable.
pub fn decode_or_default(token: Option<&str>) -> BillConfig {
    let Some(token) = token else {
        return BillConfig::default();
    };
    match decode(token) {
        Ok(config) => config,
        Err(err) => {
            debug!(error = %err, "ignoring unreadable share token");
            BillConfig::default()
        }
    }
}

pub fn share_query(token: &str) -> String {
    format!("?{SHARE_PARAM}={token}")
}

fn inflate_token(token: &str) -> Result<Vec<u8>, CodecError> {
    let token = token.trim().trim_end_matches('=');
    if token.is_empty() {
        return Err(CodecError::Empty);
    }
    let compressed = URL_SAFE_NO_PAD.decode(token)?;
    let mut json = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut json)?;
    if json.len() as u64 > MAX_INFLATED_BYTES {
        return Err(CodecError::TooLarge);
    }
    Ok(json)
}
