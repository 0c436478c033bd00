//! Small helpers: random secrets and names, and display formatting.
use rand::RngCore;
use std::path::Path;

/// Random bytes behind a generated ClickHouse password (hex doubles the length).
pub const PASSWORD_BYTES: usize = 64;

/// Random bytes behind a generated bucket name suffix.
pub const BUCKET_SUFFIX_BYTES: usize = 8;

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// 128 hex characters from the thread-local CSPRNG.
pub fn generate_password() -> String {
    random_hex(PASSWORD_BYTES)
}

pub fn bucket_suffix() -> String {
    random_hex(BUCKET_SUFFIX_BYTES)
}

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

/// Mask a secret for display, keeping a short prefix for recognition.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    format!("{}…", truncate_string(secret, 4))
}
