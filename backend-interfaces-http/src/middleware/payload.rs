use std::io::Read;

use anyhow::{bail, Result};
use axum::http::HeaderMap;
use flate2::read::GzDecoder;

use backend_domain::ScanPayload;

/// Decodes a scan body. `max_bytes` bounds the decompressed size as well,
/// since the request body limit only sees the compressed bytes.
pub fn parse_scan_payload(headers: &HeaderMap, body: &[u8], max_bytes: u64) -> Result<ScanPayload> {
    let content = maybe_gunzip(headers, body, max_bytes)?;
    let payload: ScanPayload = serde_json::from_str(&content)?;
    Ok(payload)
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8], max_bytes: u64) -> Result<String> {
    if let Some(encoding) = headers.get("Content-Encoding") {
        if encoding.to_str().unwrap_or("") == "gzip" {
            let mut decoder = GzDecoder::new(body).take(max_bytes.saturating_add(1));
            let mut out = String::new();
            decoder.read_to_string(&mut out)?;
            if out.len() as u64 > max_bytes {
                bail!("decompressed body exceeds {} bytes", max_bytes);
            }
            return Ok(out);
        }
    }
    Ok(String::from_utf8(body.to_vec())?)
}
