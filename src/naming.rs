//! Staging file names
//!
//! Staged files are named `<YYYYmmdd_HHMMSS>_<token>[.<ext>]`. The timestamp
//! only helps when reading a directory listing next to the logs; uniqueness
//! comes from the random token.

use rand::Rng;
use std::path::Path;

/// Number of hex characters in the random token (48 bits)
const TOKEN_HEX_LEN: usize = 12;

/// Longest extension carried over from the display name
const MAX_EXTENSION_LEN: usize = 16;

/// Derive a collision-resistant staging file name from a display name
///
/// # Examples
///
/// ```
/// use drive_relay::naming::unique_staging_name;
///
/// let name = unique_staging_name("report.pdf");
/// assert!(name.ends_with(".pdf"));
/// assert_eq!(name.len(), "20240101_120000_".len() + 12 + ".pdf".len());
/// ```
pub fn unique_staging_name(display_name: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let token: u64 = rand::thread_rng().r#gen::<u64>() & 0xffff_ffff_ffff;

    match safe_extension(display_name) {
        Some(ext) => format!("{timestamp}_{token:0width$x}.{ext}", width = TOKEN_HEX_LEN),
        None => format!("{timestamp}_{token:0width$x}", width = TOKEN_HEX_LEN),
    }
}

/// Extension of the display name's last component, if it is plain ASCII alphanumerics
fn safe_extension(display_name: &str) -> Option<&str> {
    let last = display_name.rsplit(['/', '\\']).next()?;
    let ext = Path::new(last).extension()?.to_str()?;

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext)
}
