use url::Url;

/// Extensions of pages that are fetched and parsed rather than saved as files
const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "php", "asp"];

/// Extensions of downloadable assets that are not images
const NON_IMAGE_ASSET_EXTENSIONS: &[&str] = &["css", "js"];

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "jpe", "jiff", "gif", "svg", "bmp", "tif", "tiff",
];

/// Coarse classification of what a URL points at, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    /// No extension, or a markup/script page extension
    Page,
    /// Stylesheets and scripts
    NonImageAsset,
    /// Anything else: images and other binary files
    Binary,
}

impl AssetClass {
    /// Classifies a URL by its extension
    pub fn of(url: &str) -> Self {
        match url_extension(url).as_deref() {
            None => Self::Page,
            Some(ext) if PAGE_EXTENSIONS.contains(&ext) => Self::Page,
            Some(ext) if NON_IMAGE_ASSET_EXTENSIONS.contains(&ext) => Self::NonImageAsset,
            Some(_) => Self::Binary,
        }
    }
}

/// Returns the lowercase file extension of the URL's path, without the dot
///
/// Query strings and fragments are ignored. A URL with nothing after its host
/// has no extension, so the top-level domain is never mistaken for one.
///
/// # Examples
///
/// ```
/// use site_downloader::url::url_extension;
///
/// assert_eq!(url_extension("http://example.com/a/pic.PNG?size=2"), Some("png".to_string()));
/// assert_eq!(url_extension("http://example.com"), None);
/// assert_eq!(url_extension("http://example.com/dir/"), None);
/// ```
pub fn url_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some() => parsed.path().to_string(),
        _ => fallback_path(url)?,
    };
    let segment = path.rsplit('/').next().unwrap_or(&path);

    // Dotfiles such as ".htaccess" have no extension.
    match segment.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < segment.len() => {
            Some(segment[pos + 1..].to_lowercase())
        }
        _ => None,
    }
}

/// Path part of a URL that did not parse, or None if it has nothing after the host
fn fallback_path(url: &str) -> Option<String> {
    let rest = url.split_once("//").map(|(_, rest)| rest).unwrap_or(url);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    rest.find('/').map(|pos| rest[pos..].to_string())
}

/// Returns true if the URL's extension is a known image format
pub fn is_image_url(url: &str) -> bool {
    url_extension(url)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}
