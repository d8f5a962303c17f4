//! Conflict value types as reported by the server after a get or merge.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Change types
// ---------------------------------------------------------------------------

/// A single kind of pending or committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    None,
    Add,
    Edit,
    Encoding,
    Rename,
    Delete,
    Undelete,
    Branch,
    Merge,
    Lock,
}

impl ChangeType {
    pub const ALL: [ChangeType; 10] = [
        Self::None,
        Self::Add,
        Self::Edit,
        Self::Encoding,
        Self::Rename,
        Self::Delete,
        Self::Undelete,
        Self::Branch,
        Self::Merge,
        Self::Lock,
    ];

    /// Bit used for this change type in a raw server mask.
    pub const fn bit(self) -> u32 {
        match self {
            Self::None => 1,
            Self::Add => 1 << 1,
            Self::Edit => 1 << 2,
            Self::Encoding => 1 << 3,
            Self::Rename => 1 << 4,
            Self::Delete => 1 << 5,
            Self::Undelete => 1 << 6,
            Self::Branch => 1 << 7,
            Self::Merge => 1 << 8,
            Self::Lock => 1 << 9,
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Encoding => "encoding",
            Self::Rename => "rename",
            Self::Delete => "delete",
            Self::Undelete => "undelete",
            Self::Branch => "branch",
            Self::Merge => "merge",
            Self::Lock => "lock",
        };
        f.write_str(name)
    }
}

/// A set of [`ChangeType`]s backed by the raw server bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<ChangeType>", into = "Vec<ChangeType>")]
pub struct ChangeTypeMask(u32);

impl ChangeTypeMask {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn contains(self, change: ChangeType) -> bool {
        self.0 & change.bit() != 0
    }

    pub fn contains_any(self, changes: &[ChangeType]) -> bool {
        changes.iter().any(|c| self.contains(*c))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ChangeType> {
        ChangeType::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<&[ChangeType]> for ChangeTypeMask {
    fn from(changes: &[ChangeType]) -> Self {
        Self(changes.iter().fold(0, |acc, c| acc | c.bit()))
    }
}

impl From<Vec<ChangeType>> for ChangeTypeMask {
    fn from(changes: Vec<ChangeType>) -> Self {
        Self::from(changes.as_slice())
    }
}

impl From<ChangeTypeMask> for Vec<ChangeType> {
    fn from(mask: ChangeTypeMask) -> Self {
        mask.iter().collect()
    }
}

impl std::fmt::Display for ChangeTypeMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        if names.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// The operation that surfaced a conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    #[default]
    Get,
    Checkin,
    Merge,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Checkin => write!(f, "checkin"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    File,
    Folder,
}

/// Terminal disposition chosen for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    AcceptMerge,
    AcceptYours,
    AcceptTheirs,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcceptMerge => write!(f, "accept_merge"),
            Self::AcceptYours => write!(f, "accept_yours"),
            Self::AcceptTheirs => write!(f, "accept_theirs"),
        }
    }
}

/// A single unresolved discrepancy between local and server item state.
///
/// Local item paths are kept in the server's TFS representation; convert
/// them with [`crate::vcpath::local_path_from_tfs`] before touching disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conflict {
    /// Server-assigned conflict id. Never 0 for an unresolved conflict.
    pub id: i32,
    pub conflict_type: ConflictType,
    pub item_type: ItemType,
    /// Local path of the source item.
    pub source_local_item: Option<String>,
    /// Local path of the target item.
    pub target_local_item: Option<String>,
    pub your_change: ChangeTypeMask,
    pub your_local_change: ChangeTypeMask,
    pub base_change: ChangeTypeMask,
    pub base_version: i32,
    pub your_version: i32,
    pub target_version: i32,
    pub target_local_modified_version: i32,
    pub your_local_modified_version: i32,
    pub base_item_id: i32,
    pub your_item_id: i32,
    pub target_item_id: i32,
    pub forced: bool,
    pub name_conflict: bool,
    pub resolved: bool,
}

impl Conflict {
    pub fn new(id: i32, conflict_type: ConflictType, item_type: ItemType) -> Self {
        Self {
            id,
            conflict_type,
            item_type,
            ..Self::default()
        }
    }

    /// Source item when present, target item otherwise.
    pub fn source_or_target(&self) -> Option<&str> {
        self.source_local_item
            .as_deref()
            .or(self.target_local_item.as_deref())
    }

    /// Target item when present, source item otherwise.
    pub fn target_or_source(&self) -> Option<&str> {
        self.target_local_item
            .as_deref()
            .or(self.source_local_item.as_deref())
    }
}
