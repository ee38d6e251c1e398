//! Object keys and storage locators.
//!
//! Keys look like `<prefix>/<unix millis>-<13 char base36 token>.<ext>`.
//! A locator is either a bare key, an `s3://bucket/key` URI, or an http(s)
//! object URL (virtual-hosted or path-style); all normalise to the bare key.

use percent_encoding::percent_decode_str;
use rand::Rng;
use reqwest::Url;

use super::error::{StorageError, StorageResult};

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 13;

pub fn generate_key(prefix: &str, file_name: &str, content_type: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let token: String = (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    let extension = extension_for(file_name, content_type);
    let prefix = prefix.trim_matches('/');

    if prefix.is_empty() {
        format!("{}-{}.{}", timestamp, token, extension)
    } else {
        format!("{}/{}-{}.{}", prefix, timestamp, token, extension)
    }
}

/// Extension from the original name when it is sane, else from the content type.
pub fn extension_for(file_name: &str, content_type: &str) -> String {
    if let Some((stem, ext)) = file_name.rsplit_once('.') {
        if !stem.is_empty()
            && !ext.is_empty()
            && ext.len() <= 10
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return ext.to_ascii_lowercase();
        }
    }

    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/webp" => "webp".to_string(),
        "image/gif" => "gif".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string()),
    }
}

pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

/// Reduces any accepted locator form to a bare object key.
pub fn normalize_key(reference: &str, bucket: &str) -> StorageResult<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(StorageError::InvalidLocator("empty reference".to_string()));
    }

    let key = if let Some(rest) = reference.strip_prefix("s3://") {
        match rest.split_once('/') {
            Some((_bucket, key)) => key.to_string(),
            None => return Err(StorageError::InvalidLocator(reference.to_string())),
        }
    } else if reference.starts_with("http://") || reference.starts_with("https://") {
        let url = Url::parse(reference)
            .map_err(|e| StorageError::InvalidLocator(format!("{}: {}", reference, e)))?;
        let path = url.path().trim_start_matches('/');
        let virtual_hosted = url
            .host_str()
            .map(|host| host.starts_with(&format!("{}.", bucket)))
            .unwrap_or(false);

        let encoded = match path.split_once('/') {
            Some((first, rest)) if !virtual_hosted && first == bucket => rest,
            _ => path,
        };
        // URL paths arrive percent-encoded; keys are stored decoded.
        percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| StorageError::InvalidLocator(format!("{}: {}", reference, e)))?
            .into_owned()
    } else {
        reference.trim_start_matches('/').to_string()
    };

    if key.is_empty() {
        return Err(StorageError::InvalidLocator(reference.to_string()));
    }
    Ok(key)
}
