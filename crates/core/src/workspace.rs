//! Servers, workspaces and the local ↔ server path mapping.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vcpath;

/// A Team Foundation server the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Endpoint URI used by the proxy.
    pub uri: String,
    /// Stable, human-readable identifier. Used for ordering and in messages.
    pub presentable_uri: String,
}

impl ServerInfo {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            presentable_uri: uri.trim_end_matches('/').to_string(),
            uri,
        }
    }
}

impl std::fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.presentable_uri)
    }
}

/// One server folder mapped onto one local folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingFolder {
    pub server_path: String,
    pub local_path: PathBuf,
}

/// A named local-to-server path mapping owned by a user on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub owner: String,
    pub server: ServerInfo,
    pub working_folders: Vec<WorkingFolder>,
}

/// A file known both by its local and its server path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPath {
    pub local_path: PathBuf,
    pub server_path: String,
}

impl Workspace {
    /// Server path of a local file, using the deepest matching working folder.
    pub fn find_server_path_by_local_path(&self, local: &Path) -> Option<String> {
        let folder = self
            .working_folders
            .iter()
            .filter(|wf| local.starts_with(&wf.local_path))
            .max_by_key(|wf| wf.local_path.components().count())?;

        let relative = local.strip_prefix(&folder.local_path).ok()?;
        let mut server_path = folder.server_path.trim_end_matches('/').to_string();
        for component in relative.components() {
            server_path.push('/');
            server_path.push_str(&component.as_os_str().to_string_lossy());
        }
        Some(server_path)
    }

    /// Local path of a server item, using the deepest matching working folder.
    pub fn find_local_path_by_server_path(&self, server_path: &str) -> Option<PathBuf> {
        let folder = self
            .working_folders
            .iter()
            .filter(|wf| vcpath::is_under(server_path, &wf.server_path))
            .max_by_key(|wf| wf.server_path.trim_end_matches('/').len())?;

        let prefix_len = folder.server_path.trim_end_matches('/').len();
        let relative = server_path[prefix_len..].trim_start_matches('/');
        let mut local = folder.local_path.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            local.push(segment);
        }
        Some(local)
    }
}

/// Group local files by the workspace that maps them.
///
/// The result is keyed by the index of the workspace in `workspaces`; when
/// several workspaces map a file, the one with the deepest working folder
/// wins. Files outside every mapping are left out.
pub fn partition_by_workspace(
    workspaces: &[Workspace],
    paths: &[PathBuf],
) -> BTreeMap<usize, Vec<ItemPath>> {
    let mut result: BTreeMap<usize, Vec<ItemPath>> = BTreeMap::new();

    for path in paths {
        let best = workspaces
            .iter()
            .enumerate()
            .filter_map(|(idx, ws)| {
                ws.working_folders
                    .iter()
                    .filter(|wf| path.starts_with(&wf.local_path))
                    .map(|wf| wf.local_path.components().count())
                    .max()
                    .map(|depth| (idx, depth))
            })
            .max_by_key(|(_, depth)| *depth);

        let Some((idx, _)) = best else {
            debug!(path = %path.display(), "file is not under any workspace mapping");
            continue;
        };
        if let Some(server_path) = workspaces[idx].find_server_path_by_local_path(path) {
            result.entry(idx).or_default().push(ItemPath {
                local_path: path.clone(),
                server_path,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(name: &str, server: &str, folders: &[(&str, &str)]) -> Workspace {
        Workspace {
            name: name.into(),
            owner: "alice".into(),
            server: ServerInfo::new(server),
            working_folders: folders
                .iter()
                .map(|(s, l)| WorkingFolder {
                    server_path: s.to_string(),
                    local_path: PathBuf::from(l),
                })
                .collect(),
        }
    }

    #[test]
    fn test_server_info_presentable_uri() {
        let server = ServerInfo::new("http://tfs:8080/");
        assert_eq!(server.presentable_uri, "http://tfs:8080");
        assert_eq!(server.to_string(), "http://tfs:8080");
    }

    #[test]
    fn test_find_server_path_prefers_deepest_folder() {
        let ws = workspace(
            "ws",
            "http://tfs",
            &[("$/Proj", "/src"), ("$/Other/lib", "/src/lib")],
        );
        assert_eq!(
            ws.find_server_path_by_local_path(Path::new("/src/a/b.rs")),
            Some("$/Proj/a/b.rs".to_string())
        );
        assert_eq!(
            ws.find_server_path_by_local_path(Path::new("/src/lib/x.rs")),
            Some("$/Other/lib/x.rs".to_string())
        );
        assert_eq!(ws.find_server_path_by_local_path(Path::new("/elsewhere")), None);
    }

    #[test]
    fn test_find_local_path_by_server_path() {
        let ws = workspace("ws", "http://tfs", &[("$/Proj/", "/src")]);
        assert_eq!(
            ws.find_local_path_by_server_path("$/Proj/dir/renamed.rs"),
            Some(PathBuf::from("/src/dir/renamed.rs"))
        );
        assert_eq!(
            ws.find_local_path_by_server_path("$/Proj"),
            Some(PathBuf::from("/src"))
        );
        assert_eq!(ws.find_local_path_by_server_path("$/Elsewhere/a"), None);
    }

    #[test]
    fn test_partition_by_workspace() {
        let workspaces = vec![
            workspace("a", "http://one", &[("$/A", "/work/a")]),
            workspace("b", "http://two", &[("$/B", "/work/b")]),
        ];
        let paths = vec![
            PathBuf::from("/work/a/1.txt"),
            PathBuf::from("/work/b/2.txt"),
            PathBuf::from("/work/a/sub/3.txt"),
            PathBuf::from("/tmp/unmapped.txt"),
        ];

        let parts = partition_by_workspace(&workspaces, &paths);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[&0].len(), 2);
        assert_eq!(parts[&0][1].server_path, "$/A/sub/3.txt");
        assert_eq!(parts[&1][0].server_path, "$/B/2.txt");
    }

    #[test]
    fn test_partition_empty_when_nothing_mapped() {
        let workspaces = vec![workspace("a", "http://one", &[("$/A", "/work/a")])];
        let parts = partition_by_workspace(&workspaces, &[PathBuf::from("/tmp/x")]);
        assert!(parts.is_empty());
    }
}
