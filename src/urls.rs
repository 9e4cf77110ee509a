//! URL normalization helpers shared by extractors and sites.

use url::Url;

/// Undo the escaped slash forms found in embedded JSON and script text
/// (`/`, `\/`).
pub fn unescape_url(raw: &str) -> String {
    raw.replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\/", "/")
}

/// `true` for absolute `http(s)` URLs with a host.
pub fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Upgrade protocol-relative and plain-http URLs to https.
pub fn ensure_https(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = raw.strip_prefix("http://") {
        format!("https://{rest}")
    } else {
        raw.to_string()
    }
}

/// Resolve `href` against the page it was found on.
///
/// Returns `None` for empty hrefs and hrefs that cannot be resolved.
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if is_http_url(href) {
        return Some(href.to_string());
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .ok()
        .map(String::from)
}

/// `scheme://host[:port]` of a URL.
pub fn origin_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    match parsed.origin() {
        url::Origin::Tuple(..) => Some(parsed.origin().ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_json_slashes() {
        assert_eq!(
            unescape_url(r"https:\/\/upos-sz.bilivideo.com/a.m4s"),
            "https://upos-sz.bilivideo.com/a.m4s"
        );
    }

    #[test]
    fn https_upgrade() {
        assert_eq!(ensure_https("//cdn.example/a.mp4"), "https://cdn.example/a.mp4");
        assert_eq!(ensure_https("http://cdn.example/a.mp4"), "https://cdn.example/a.mp4");
        assert_eq!(ensure_https("https://cdn.example/a.mp4"), "https://cdn.example/a.mp4");
    }

    #[test]
    fn absolutize_relative_and_absolute() {
        assert_eq!(
            absolutize("https://site.example/anime/x/", "/episode-1/").as_deref(),
            Some("https://site.example/episode-1/")
        );
        assert_eq!(
            absolutize("https://site.example/", "https://other.example/a").as_deref(),
            Some("https://other.example/a")
        );
        assert_eq!(absolutize("https://site.example/", "  "), None);
    }

    #[test]
    fn http_url_check() {
        assert!(is_http_url("https://x/a.m4s"));
        assert!(!is_http_url("ftp://x/a"));
        assert!(!is_http_url("/relative"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn origin_strips_path() {
        assert_eq!(
            origin_of("https://www.bilibili.tv/en/play/1").as_deref(),
            Some("https://www.bilibili.tv")
        );
    }
}
