//! Helpers for version-control paths.
//!
//! Server paths look like `$/Project/dir/file.txt`. Local paths travel over
//! the wire in "TFS representation", which uses `\` separators regardless of
//! the client platform.

use std::path::{Path, PathBuf};

/// Root of every server path.
pub const ROOT: &str = "$/";

/// Returns the team project a server path belongs to (`$/Project`).
///
/// A path that is the root itself, or not rooted at all, is returned as-is.
pub fn path_to_project(server_path: &str) -> String {
    let Some(rest) = server_path.strip_prefix(ROOT) else {
        return server_path.to_string();
    };
    match rest.find('/') {
        Some(pos) => format!("{}{}", ROOT, &rest[..pos]),
        None => server_path.trim_end_matches('/').to_string(),
    }
}

/// The part of a server path below its team project (`bin/a.dll` for
/// `$/Proj/bin/a.dll`). Empty for the team project itself.
pub fn relative_to_project(server_path: &str) -> &str {
    let Some(rest) = server_path.strip_prefix(ROOT) else {
        return server_path;
    };
    rest.split_once('/').map(|(_, tail)| tail).unwrap_or("")
}

/// Whether `path` equals `parent` or lies below it (case-insensitive, as the
/// server treats item names).
pub fn is_under(path: &str, parent: &str) -> bool {
    let path = path.to_ascii_lowercase();
    let parent = parent.trim_end_matches('/').to_ascii_lowercase();
    path == parent || path.starts_with(&format!("{}/", parent))
}

/// Convert a local path received from the server into a platform path.
pub fn local_path_from_tfs(tfs_path: &str) -> PathBuf {
    PathBuf::from(tfs_path.replace('\\', std::path::MAIN_SEPARATOR_STR))
}

/// Convert a platform path into the representation sent to the server.
pub fn to_tfs_representation(path: &Path) -> String {
    path.to_string_lossy().replace('/', "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_to_project() {
        assert_eq!(path_to_project("$/Proj/src/main.rs"), "$/Proj");
        assert_eq!(path_to_project("$/Proj"), "$/Proj");
        assert_eq!(path_to_project("$/Proj/"), "$/Proj");
        assert_eq!(path_to_project("relative/path"), "relative/path");
    }

    #[test]
    fn test_relative_to_project() {
        assert_eq!(relative_to_project("$/Proj/bin/tool.dll"), "bin/tool.dll");
        assert_eq!(relative_to_project("$/Proj"), "");
        assert_eq!(relative_to_project("$/Proj/"), "");
        assert_eq!(relative_to_project("plain/path"), "plain/path");
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("$/Proj/src/a.rs", "$/Proj"));
        assert!(is_under("$/proj/SRC", "$/Proj/src/"));
        assert!(is_under("$/Proj", "$/Proj"));
        assert!(!is_under("$/Project2/a.rs", "$/Proj"));
    }

    #[cfg(unix)]
    #[test]
    fn test_tfs_representation_round_trip() {
        let local = local_path_from_tfs("\\ws\\src\\a.rs");
        assert_eq!(local, PathBuf::from("/ws/src/a.rs"));
        assert_eq!(to_tfs_representation(&local), "\\ws\\src\\a.rs");
    }
}
