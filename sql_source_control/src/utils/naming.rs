//! Naming utilities for sql_source_control
//!
//! File names, cache keys and content fingerprints for generated scripts.

use std::path::{Component, Path};

/// Characters that cannot appear in a file name on common filesystems
const UNSAFE_FILE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names Windows reserves regardless of extension
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make a file name safe for the host filesystem
pub fn sanitize_file_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if UNSAFE_FILE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed_len = sanitized.trim_end_matches(['.', ' ']).len();
    sanitized.truncate(trimmed_len);

    if sanitized.is_empty() {
        return "_".to_string();
    }

    let stem = sanitized.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        sanitized = format!("_{}", sanitized);
    }

    sanitized
}

/// Forward-slash form of a path with `.` segments removed
pub fn normalize_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::CurDir => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Trim content and drop control characters other than line feeds
pub fn strip_control_characters(content: &str) -> String {
    content
        .trim()
        .chars()
        .filter(|c| {
            let code = *c as u32;
            !(code <= 0x09 || (0x0B..=0x1F).contains(&code) || (0x7F..=0x9F).contains(&code))
        })
        .collect()
}

/// Hex MD5 checksum of script content
pub fn checksum(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}
