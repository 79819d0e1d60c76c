//! Content handling for fetched responses
//!
//! This module decides what a response is (page to parse, file to save, or
//! nothing of interest), how its text is decoded, and what saved files are
//! called.

mod charset;
mod inline;
mod naming;

pub use charset::{decode_page, resolve_encoding, sniff_encoding};
pub use inline::{decode_data_uri, save_data_uri, InlineAsset, InlineAssetError};
pub use naming::{
    disposition_filename, file_name_for, random_name, snapshot_name, RANDOM_NAME_LEN,
};

use crate::url::match_extension;

/// What a response turned out to be, judged by its declared media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// `text/html`: decode and extract links and resources
    HtmlPage,

    /// `application/octet-stream`: the file name comes from
    /// `Content-Disposition` or the URL path
    OctetStream,

    /// A media type whose conventional extension is on the target list;
    /// carries that extension with its leading dot
    TypedResource(String),

    /// Nothing to do with this response
    Ignored,
}

/// Classifies a media type against the configured file types
///
/// # Arguments
///
/// * `media_type` - The media type essence, e.g. `image/png` (no parameters)
/// * `file_types` - The configured target extensions
///
/// # Examples
///
/// ```
/// use harvester::content::{classify, ContentKind};
///
/// let types = vec!["png".to_string()];
/// assert_eq!(classify("text/html", &types), ContentKind::HtmlPage);
/// assert_eq!(classify("image/png", &types), ContentKind::TypedResource(".png".into()));
/// assert_eq!(classify("image/gif", &types), ContentKind::Ignored);
/// ```
pub fn classify(media_type: &str, file_types: &[String]) -> ContentKind {
    match media_type {
        "text/html" => ContentKind::HtmlPage,
        "application/octet-stream" => ContentKind::OctetStream,
        other => match_mime_extension(other, file_types)
            .map(ContentKind::TypedResource)
            .unwrap_or(ContentKind::Ignored),
    }
}

/// Finds a conventional extension of `media_type` that is on the target list
///
/// Returns the media type's own extension (with a leading dot), which may be
/// longer than the configured entry when that entry is a prefix of it.
pub fn match_mime_extension(media_type: &str, file_types: &[String]) -> Option<String> {
    let extensions = mime_guess::get_mime_extensions_str(media_type)?;

    extensions
        .iter()
        .map(|ext| format!(".{ext}"))
        .find(|ext| match_extension(ext, file_types).is_some())
}

/// Returns true when the declared media type is a conventional type for `ext`
pub fn media_type_matches_extension(media_type: &str, ext: &str) -> bool {
    mime_guess::from_ext(ext.trim_start_matches('.'))
        .iter()
        .any(|guess| guess.essence_str() == media_type)
}

/// Returns true when full pages should be saved too, i.e. when an HTML
/// extension is on the target list
pub fn wants_full_html(file_types: &[String]) -> bool {
    match_mime_extension("text/html", file_types).is_some()
}
