use url::Url;

/// Derives the canonical domain key for a URL
///
/// The host is taken from the parsed URL, lowercased, and stripped of a
/// leading `www.`. An explicit non-default port is kept so two servers on one
/// host do not share failure statistics. Subdomains are kept as-is: telling
/// `info.blog.example.com` apart from `example.com` reliably would require a
/// public-suffix list, and for failure statistics a per-subdomain key is good
/// enough.
///
/// Input that does not parse as an absolute URL (a scheme-less seed line, for
/// instance) falls back to a plain string split.
///
/// # Examples
///
/// ```
/// use site_downloader::url::domain_key;
///
/// assert_eq!(domain_key("http://www.example.com/path"), "example.com");
/// assert_eq!(domain_key("http://img.example.com/a.gif"), "img.example.com");
/// assert_eq!(domain_key("http://WWW.Example.COM/a.png"), "example.com");
/// assert_eq!(domain_key("example.com"), "example.com");
/// ```
pub fn domain_key(url: &str) -> String {
    let host = match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some() => extract_host(&parsed),
        _ => fallback_host(url),
    };

    strip_www(host)
}

/// Returns the lowercased host of a parsed URL, with its port if one is given
pub fn extract_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

fn fallback_host(url: &str) -> String {
    let rest = url.split_once("//").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority.rsplit('@').next().unwrap_or(authority);
    host.to_lowercase()
}

fn strip_www(host: String) -> String {
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}
