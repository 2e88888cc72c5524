//! Recognising video URLs and deriving record titles from them.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::error::ValidationError;

// Scheme and `www.` are optional; `youtu.be` and `youtube.com` hosts need a path.
static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$").expect("valid video URL pattern")
});

static VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid video id pattern"));

const FALLBACK_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FALLBACK_LEN: usize = 7;

pub fn is_valid_url(raw: &str) -> bool {
    validate_url(raw).is_ok()
}

/// Returns the trimmed URL when it looks like a video page.
pub fn validate_url(raw: &str) -> Result<String, ValidationError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !VIDEO_URL.is_match(url) {
        return Err(ValidationError::UnsupportedUrl(url.to_string()));
    }
    Ok(url.to_string())
}

/// Extracts the 11-character video id following `v=` or a `/`
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Title for a new record. Falls back to a random `video_xxxxxxx` label when no
/// id can be found.
pub fn derive_title(url: &str) -> String {
    let id = match extract_video_id(url) {
        Some(id) => id.to_string(),
        None => fallback_label(),
    };
    format!("YouTube Video ID: {id}")
}

fn fallback_label() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..FALLBACK_LEN)
        .map(|_| FALLBACK_ALPHABET[rng.gen_range(0..FALLBACK_ALPHABET.len())] as char)
        .collect();
    format!("video_{suffix}")
}
