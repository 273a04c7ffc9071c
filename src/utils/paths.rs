use std::borrow::Cow;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result, bail};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

// Maximum size of a single file we are willing to parse: 10MB
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

// Characters that cannot appear literally in a virtual path segment
const SEGMENT_ENCODE_SET: &AsciiSet =
    &CONTROLS.add(b'/').add(b'%').add(b' ').add(b'"').add(b'\'').add(b'|').add(b'$');

/// Encodes a free-form name (a tag, a source, a model) as a single virtual path segment
///
/// # Examples
///
/// ```
/// use chatfs::utils::paths::encode_segment;
///
/// assert_eq!(encode_segment("work/client a"), "work%2Fclient%20a");
/// assert_eq!(encode_segment("python"), "python");
/// assert_eq!(encode_segment(".."), "%2E%2E");
/// ```
pub fn encode_segment(name: &str) -> String {
    // `.` and `..` would be read back as navigation
    if !name.is_empty() && name.bytes().all(|b| b == b'.') {
        return "%2E".repeat(name.len());
    }
    utf8_percent_encode(name, SEGMENT_ENCODE_SET).to_string()
}

/// Decodes a virtual path segment back to the name it encodes
///
/// # Examples
///
/// ```
/// use chatfs::utils::paths::decode_segment;
///
/// assert_eq!(decode_segment("work%2Fclient%20a"), "work/client a");
/// ```
pub fn decode_segment(segment: &str) -> String {
    match percent_decode_str(segment).decode_utf8_lossy() {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Validates that a file's size is within acceptable limits (10MB)
///
/// Takes an open file handle so the check and the subsequent read see the same file.
pub fn validate_file_size(file: &File, path: &Path) -> Result<()> {
    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;

    let file_size = metadata.len();
    if file_size > MAX_FILE_SIZE_BYTES {
        bail!(
            "File too large: {} ({} bytes, max {} bytes)",
            path.display(),
            file_size,
            MAX_FILE_SIZE_BYTES
        );
    }

    Ok(())
}

/// Rejects symlinks so a crafted data directory cannot redirect reads elsewhere
pub fn validate_path_not_symlink(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if metadata.file_type().is_symlink() {
        bail!("Symlinks are not allowed: {}", path.display());
    }
    Ok(())
}

/// Opens a file for reading without following symlinks, then checks its size
pub fn safe_open_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW);
    }

    #[cfg(not(unix))]
    validate_path_not_symlink(path)?;

    let file =
        options.open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    validate_file_size(&file, path)?;
    Ok(file)
}

/// Formats a path with ~ substitution for the home directory
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && !home.is_empty()
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    path_str.into_owned()
}
