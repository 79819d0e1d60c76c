use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of generated file names
pub const RANDOM_NAME_LEN: usize = 16;

/// Derives the file name for a resource from its URL path
///
/// Takes the last path segment. If it already contains `ext`, everything
/// after the first occurrence of `ext` is cut off; otherwise `ext` is
/// appended. Paths without a usable segment get a random name instead.
///
/// # Arguments
///
/// * `path` - The URL path (percent-encoded, as returned by `Url::path`)
/// * `ext` - The target extension, with its leading dot
///
/// # Examples
///
/// ```
/// use harvester::content::file_name_for;
///
/// assert_eq!(file_name_for("/img/pic.jpg", ".jpg"), "pic.jpg");
/// assert_eq!(file_name_for("/download/report", ".pdf"), "report.pdf");
/// assert_eq!(file_name_for("/", ".png").len(), 16 + 4);
/// ```
pub fn file_name_for(path: &str, ext: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let base = decoded
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let name = if base.is_empty() || base == "." || base == ":" {
        format!("{}{}", random_name(RANDOM_NAME_LEN), ext)
    } else if let Some(idx) = base.find(ext) {
        base[..idx + ext.len()].to_string()
    } else {
        format!("{base}{ext}")
    };

    sanitized_or_random(&name, ext)
}

/// Extracts the `filename` parameter of a `Content-Disposition` header
///
/// The RFC 5987 `filename*=charset''value` form is preferred when present.
pub fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;

    for param in header.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "filename*" {
            let encoded = value.rsplit('\'').next().unwrap_or(value);
            if let Ok(decoded) = urlencoding::decode(encoded) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        } else if key == "filename" {
            let unquoted = value.trim_matches('"');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_string());
            }
        }
    }

    plain
}

/// Name of the saved copy of a page, taken from its title
pub fn snapshot_name(title: &str) -> String {
    sanitized_or_random(&format!("{}.html", title.trim()), ".html")
}

/// Generates a random alphanumeric string of length `len`
pub fn random_name(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn sanitized_or_random(name: &str, ext: &str) -> String {
    let clean = sanitize_filename::sanitize(name);
    if clean.is_empty() || clean == ext {
        format!("{}{}", random_name(RANDOM_NAME_LEN), ext)
    } else {
        clean
    }
}
