//! Utility functions for path manipulation

use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Suffix appended to a destination's file name while bytes are still arriving
pub const PART_SUFFIX: &str = ".part";

/// Temporary sibling path used while downloading to `destination`
///
/// The temporary file lives in the same directory so the final rename never
/// crosses a filesystem boundary. Returns `None` if `destination` has no file name.
///
/// # Examples
///
/// ```
/// use fetch_dl::utils::part_path;
/// use std::path::Path;
///
/// let part = part_path(Path::new("/tmp/pics/a.png")).unwrap();
/// assert_eq!(part, Path::new("/tmp/pics/a.png.part"));
/// assert!(part_path(Path::new("/")).is_none());
/// ```
pub fn part_path(destination: &Path) -> Option<PathBuf> {
    let file_name = destination.file_name()?;
    let mut part_name = OsString::from(file_name);
    part_name.push(PART_SUFFIX);
    Some(destination.with_file_name(part_name))
}

#[allow(clippy::expect_used)]
fn invalid_name_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // word characters and whitespace survive
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("static regex is valid"))
}

/// Strip every character that is not a word character or whitespace
///
/// Removes path separators, dots and punctuation, so the result is always a
/// single path component (possibly empty).
///
/// # Examples
///
/// ```
/// use fetch_dl::utils::sanitize_name;
///
/// assert_eq!(sanitize_name("Summer Sale!"), "Summer Sale");
/// assert_eq!(sanitize_name("../../etc/passwd"), "etcpasswd");
/// assert_eq!(sanitize_name("???"), "");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    invalid_name_chars().replace_all(name, "").into_owned()
}
