//! Async URL loading for native hosts.
//!
//! Supported sources: `http(s)://` (reqwest), `data:` URLs with a base64
//! payload, and `file://` URLs or bare filesystem paths (tokio::fs). Loads
//! are cancelled by dropping the future.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::{DecodedAudio, decode_audio};
use crate::error::{AssetLoadError, AssetLoadErrorKind};

/// Raw bytes of a source plus whatever format hint the transport offered
/// (content type, MIME type from a data URL, or the file extension).
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub hint: Option<String>,
}

/// Fetch and decode the audio behind `url`.
pub async fn load_audio(url: &str) -> Result<DecodedAudio, AssetLoadError> {
    let fetched = fetch(url).await?;
    decode_audio(&fetched.bytes, url, fetched.hint.as_deref())
}

/// Fetch the raw bytes behind `url` without decoding them.
pub async fn fetch(url: &str) -> Result<FetchedAsset, AssetLoadError> {
    let fetch_err = |reason: String| AssetLoadError::new(url, AssetLoadErrorKind::Fetch, reason);

    if url.starts_with("http://") || url.starts_with("https://") {
        log::debug!("fetching {url}");
        let response = reqwest::get(url).await.map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let hint = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| extension(url));
        let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            hint,
        })
    } else if let Some(rest) = url.strip_prefix("data:") {
        decode_data_url(rest).map_err(fetch_err)
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| fetch_err(format!("{path}: {e}")))?;
        Ok(FetchedAsset {
            bytes,
            hint: extension(path),
        })
    }
}

/// `data:[<mime>][;base64],<payload>`; only base64 payloads carry audio.
fn decode_data_url(rest: &str) -> Result<FetchedAsset, String> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no payload".to_string())?;
    let mime = meta.strip_suffix(";base64").ok_or_else(|| "data URL is not base64".to_string())?;
    let bytes = BASE64.decode(payload.trim()).map_err(|e| e.to_string())?;
    Ok(FetchedAsset {
        bytes,
        hint: (!mime.is_empty()).then(|| mime.to_string()),
    })
}

fn extension(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}
