//! Working-directory path handling.
//!
//! Remote paths are slash-delimited strings rooted at `/`. They never touch
//! the local filesystem, so normalization is purely lexical.

/// Root of the remote file tree.
pub const ROOT: &str = "/";

/// Normalize a working directory.
///
/// The result always starts with `/`, has no trailing `/` (except the root
/// itself), drops empty and `.` segments, and resolves `..` lexically. A `..`
/// at the root stays at the root.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Join a child name onto a directory.
pub fn join(dir: &str, name: &str) -> String {
    normalize(&format!("{}/{}", dir, name))
}

/// Parent of a directory, or `None` at the root.
pub fn parent(path: &str) -> Option<String> {
    let normalized = normalize(path);
    if normalized == ROOT {
        return None;
    }
    Some(normalize(&format!("{}/..", normalized)))
}
