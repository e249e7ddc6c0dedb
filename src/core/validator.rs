//! Fixed-pattern filename check.

/// Extension every accepted name ends with.
pub const EXTENSION: &str = ".2pg";

/// Number of lowercase letters before the extension.
pub const STEM_LEN: usize = 5;

/// Returns true iff `name` is five ASCII lowercase letters followed by `.2pg`.
///
/// The check is byte-exact: no trimming, no case folding, no trailing newline.
pub fn is_valid_filename(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() != STEM_LEN + EXTENSION.len() {
        return false;
    }
    let (stem, ext) = bytes.split_at(STEM_LEN);
    stem.iter().all(u8::is_ascii_lowercase) && ext == EXTENSION.as_bytes()
}
