/// Returns true if the character may appear in a saved filename
///
/// Ampersands are excluded even though most filesystems accept them: browsers
/// expect them to be written as `&amp;` inside HTML, and rewritten references
/// would otherwise become ambiguous.
pub fn is_filename_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '.' | '_' | '-' | '=')
}

/// Strips every character that is not safe in a filename on all platforms
///
/// # Examples
///
/// ```
/// use site_downloader::url::usable_filename;
///
/// assert_eq!(usable_filename("image.php?id=3&size=big"), "image.phpid=3size=big");
/// assert_eq!(usable_filename("my file (1).png"), "myfile1.png");
/// ```
pub fn usable_filename(name: &str) -> String {
    name.chars().filter(|&ch| is_filename_char(ch)).collect()
}

/// Returns the part of a reference after its last `/`
pub fn last_segment(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}
