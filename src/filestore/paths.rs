use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, AppResult};

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String {
    input.nfc().collect::<String>()
}

/// Validate a repository-relative path:
/// - segments separated by '/', none empty (no leading/trailing '/' or '//')
/// - no '.' or '..' segments
/// - no NUL characters
pub fn validate_repo_path(path: &str) -> AppResult<()> {
    if path.is_empty() {
        return Err(AppError::invalid("path cannot be empty"));
    }
    if path.contains('\u{0000}') {
        return Err(AppError::invalid("path cannot contain NUL characters"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(AppError::invalid(format!("leading or trailing '/' is not allowed: '{}'", path)));
    }
    for seg in path.split('/') {
        if seg.is_empty() {
            return Err(AppError::invalid(format!("empty segment in path '{}'", path)));
        }
        if seg == "." || seg == ".." {
            return Err(AppError::invalid(format!("segments '.' and '..' are not allowed: '{}'", path)));
        }
    }
    Ok(())
}

/// Directory argument for listings: surrounding slashes are dropped and empty means root.
pub fn normalize_dir_path(raw: &str) -> AppResult<String> {
    let p = raw.trim().trim_matches('/');
    if p.is_empty() {
        return Ok(String::new());
    }
    validate_repo_path(p)?;
    Ok(p.to_string())
}

/// File argument for mutations: must name a concrete path.
pub fn normalize_file_path(raw: &str) -> AppResult<String> {
    let p = raw.trim().trim_start_matches('/');
    validate_repo_path(p)?;
    Ok(p.to_string())
}

/// True when both paths name the same object once Unicode-normalized.
pub fn same_path(a: &str, b: &str) -> bool {
    a == b || normalize_nfc(a) == normalize_nfc(b)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod paths_tests;
