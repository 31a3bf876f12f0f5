//! Path validation
//!
//! Handles path validation and security checks for the host backend.

/// Validate that a path is safe (no directory traversal, no embedded NUL)
pub fn is_safe_path(path: &str) -> bool {
    !path.contains('\0') && !path.split('/').any(|component| component == "..")
}
