/// A configured file type found inside a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMatch {
    /// The matched extension, always with a leading dot (e.g. `.jpg`)
    pub ext: String,

    /// Byte offset of the last dot in the scanned string
    pub dot: usize,
}

impl ExtensionMatch {
    /// Byte offset just past the matched extension
    pub fn end(&self) -> usize {
        self.dot + self.ext.len()
    }

    /// Cuts `value` right after the matched extension
    ///
    /// `value` must be the string the match was made against.
    pub fn truncate<'a>(&self, value: &'a str) -> &'a str {
        &value[..self.end().min(value.len())]
    }
}

/// Checks whether a string carries one of the configured file extensions
///
/// Only the text after the last `.` is inspected. An extension matches when
/// that text equals it or starts with it, and configured extensions may be
/// written with or without their leading dot. Matching is case-sensitive.
///
/// # Arguments
///
/// * `value` - An attribute value, URL path or file name
/// * `extensions` - The configured file types
///
/// # Returns
///
/// * `Some(ExtensionMatch)` - The first configured extension that matched
/// * `None` - No dot in `value`, or no extension matched
///
/// # Examples
///
/// ```
/// use harvester::url::match_extension;
///
/// let exts = vec!["jpg".to_string()];
///
/// let m = match_extension("photo.JPEG.jpg", &exts).unwrap();
/// assert_eq!(m.truncate("photo.JPEG.jpg"), "photo.JPEG.jpg");
///
/// let m = match_extension("pic.jpg?w=200", &exts).unwrap();
/// assert_eq!(m.ext, ".jpg");
/// assert_eq!(m.truncate("pic.jpg?w=200"), "pic.jpg");
///
/// assert!(match_extension("photo.png", &exts).is_none());
/// ```
pub fn match_extension(value: &str, extensions: &[String]) -> Option<ExtensionMatch> {
    let dot = value.rfind('.')?;
    let tail = &value[dot + 1..];

    extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.'))
        .filter(|ext| !ext.is_empty())
        .find(|ext| tail.starts_with(ext))
        .map(|ext| ExtensionMatch {
            ext: format!(".{ext}"),
            dot,
        })
}
