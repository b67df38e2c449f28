//! Small helpers shared by the crawler, storage and orchestration layers

pub mod timezone;

use url::Url;

/// User agent sent with every crawl request
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Builds a URL from a protocol, a base (host or bucket name), path parts and
/// optional query parameters.
///
/// Object-store and file-like protocols (`s3`, `s3a`, `s3n`, `ftp`, `file`) join
/// the parts with `/` verbatim. `http`/`https` resolve each part against the URL
/// built so far using RFC 3986 reference resolution, so a part replaces the last
/// path segment unless that segment ends in `/`. Query parameters are only
/// appended for `http`/`https`.
///
/// ```
/// use stockpipe::utils::build_url;
///
/// assert_eq!(
///     build_url("s3a", "my-bucket", &["path", "to", "file.txt"], &[]).unwrap(),
///     "s3a://my-bucket/path/to/file.txt"
/// );
/// assert_eq!(
///     build_url("https", "example.com", &["api/", "v1"], &[("id", "123")]).unwrap(),
///     "https://example.com/api/v1?id=123"
/// );
/// ```
pub fn build_url(
    protocol: &str,
    base_url: &str,
    parts: &[&str],
    params: &[(&str, &str)],
) -> Result<String, url::ParseError> {
    let protocol = if protocol.ends_with("://") {
        protocol.to_string()
    } else {
        format!("{protocol}://")
    };

    let is_http = protocol == "http://" || protocol == "https://";

    let mut url = if protocol.starts_with("s3") || protocol == "ftp://" || protocol == "file://" {
        format!("{}{}/{}", protocol, base_url, parts.join("/"))
    } else if parts.is_empty() {
        format!("{protocol}{base_url}")
    } else {
        let mut joined = Url::parse(&format!("{protocol}{base_url}"))?;
        for part in parts {
            joined = joined.join(part)?;
        }
        joined.to_string()
    };

    if is_http && !params.is_empty() {
        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        url = format!("{url}?{query}");
    }

    Ok(url)
}
