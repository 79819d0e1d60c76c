use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use super::naming::{random_name, RANDOM_NAME_LEN};
use crate::output::write_atomic;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";

const PNG_SIGNATURES: &[&[u8]] = &[PNG_MAGIC];
const JPEG_SIGNATURES: &[&[u8]] = &[JPEG_MAGIC];
const GIF_SIGNATURES: &[&[u8]] = &[GIF87_MAGIC, GIF89_MAGIC];

/// Errors from decoding or saving a `data:` URI
#[derive(Error, Debug)]
pub enum InlineAssetError {
    #[error("malformed data URI")]
    Malformed,

    #[error("data URI is not base64-encoded")]
    NotBase64,

    #[error("unsupported inline media type: {0}")]
    UnsupportedMedia(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid {0} image")]
    Signature(&'static str),

    #[error("failed to write inline asset {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A decoded inline image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsset {
    /// Extension to save under, with its leading dot
    pub ext: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodes a base64 `data:` URI holding a PNG, JPEG or GIF image
///
/// The payload's leading bytes must match the declared image format.
///
/// # Examples
///
/// ```
/// use harvester::content::decode_data_uri;
///
/// let asset = decode_data_uri("data:image/gif;base64,R0lGODlhAQABAAAAACw=").unwrap();
/// assert_eq!(asset.ext, ".gif");
/// assert!(decode_data_uri("data:text/plain;base64,aGk=").is_err());
/// ```
pub fn decode_data_uri(uri: &str) -> Result<InlineAsset, InlineAssetError> {
    let rest = uri
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &uri[5..])
        .ok_or(InlineAssetError::Malformed)?;
    let (header, payload) = rest.split_once(',').ok_or(InlineAssetError::Malformed)?;

    let mut params = header.split(';').map(str::trim);
    let media_type = params.next().unwrap_or_default().to_ascii_lowercase();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(InlineAssetError::NotBase64);
    }

    let (ext, label, magic) = match media_type.as_str() {
        "image/png" => (".png", "PNG", PNG_SIGNATURES),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => (".jpg", "JPEG", JPEG_SIGNATURES),
        "image/gif" => (".gif", "GIF", GIF_SIGNATURES),
        _ => return Err(InlineAssetError::UnsupportedMedia(media_type)),
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;

    if !magic.iter().any(|m| bytes.starts_with(m)) {
        return Err(InlineAssetError::Signature(label));
    }

    Ok(InlineAsset { ext, bytes })
}

/// Decodes a `data:` URI and writes the image into `dir` under a random name
///
/// Returns the path of the written file.
pub async fn save_data_uri(uri: &str, dir: &Path) -> Result<PathBuf, InlineAssetError> {
    let asset = decode_data_uri(uri)?;
    let path = dir.join(format!("{}{}", random_name(RANDOM_NAME_LEN), asset.ext));

    write_atomic(&path, &asset.bytes)
        .await
        .map_err(|source| InlineAssetError::Write {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}
