//! Pure predicates deciding how a conflict can be resolved.
//!
//! The resolver relies on these three checks agreeing exactly: the content
//! and name steps of `accept_merge` run only for the matching predicate.

use tracing::trace;

use super::model::{ChangeType, Conflict, ConflictType, ItemType};

const RENAME_OR_EDIT: [ChangeType; 2] = [ChangeType::Rename, ChangeType::Edit];

/// Get/checkin conflict on the item name rather than its content.
fn is_namespace_conflict(conflict: &Conflict) -> bool {
    matches!(
        conflict.conflict_type,
        ConflictType::Get | ConflictType::Checkin
    ) && conflict.name_conflict
}

/// Whether the conflict can be resolved with `AcceptMerge`.
pub fn is_mergeable(conflict: &Conflict) -> bool {
    if conflict.source_local_item.is_none() {
        return false;
    }

    let namespace = is_namespace_conflict(conflict);

    if !namespace {
        let yours_renamed_or_modified = conflict.your_change.contains_any(&RENAME_OR_EDIT)
            || conflict.your_local_change.contains_any(&RENAME_OR_EDIT);
        let base_renamed_or_modified = conflict.base_change.contains_any(&RENAME_OR_EDIT);
        if yours_renamed_or_modified && base_renamed_or_modified {
            return true;
        }
    }

    if conflict.item_type != ItemType::Folder
        && !namespace
        && conflict.conflict_type == ConflictType::Merge
        && conflict.base_change.contains(ChangeType::Edit)
    {
        if conflict.your_local_change.contains(ChangeType::Edit) || conflict.forced {
            return true;
        }
        if conflict.target_local_modified_version != conflict.base_version
            || conflict.your_local_modified_version != conflict.your_version
        {
            return true;
        }
    }

    trace!(conflict_id = conflict.id, "conflict is not mergeable");
    false
}

/// Either side renamed the item.
pub fn is_name_conflict(conflict: &Conflict) -> bool {
    conflict.your_change.contains(ChangeType::Rename)
        || conflict.base_change.contains(ChangeType::Rename)
}

/// Either side edited the item content.
pub fn is_content_conflict(conflict: &Conflict) -> bool {
    conflict.your_change.contains(ChangeType::Edit)
        || conflict.base_change.contains(ChangeType::Edit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::model::ChangeTypeMask;

    fn mask(changes: &[ChangeType]) -> ChangeTypeMask {
        ChangeTypeMask::from(changes)
    }

    fn get_conflict() -> Conflict {
        Conflict {
            source_local_item: Some("/ws/a.txt".into()),
            target_local_item: Some("/ws/a.txt".into()),
            ..Conflict::new(1, ConflictType::Get, ItemType::File)
        }
    }

    #[test]
    fn test_no_source_item_never_mergeable() {
        for conflict_type in [ConflictType::Get, ConflictType::Checkin, ConflictType::Merge] {
            let conflict = Conflict {
                source_local_item: None,
                your_change: mask(&[ChangeType::Edit]),
                your_local_change: mask(&[ChangeType::Edit]),
                base_change: mask(&[ChangeType::Edit]),
                forced: true,
                ..Conflict::new(1, conflict_type, ItemType::File)
            };
            assert!(!is_mergeable(&conflict));
        }
    }

    #[test]
    fn test_both_sides_edited_is_mergeable() {
        let conflict = Conflict {
            your_change: mask(&[ChangeType::Edit]),
            base_change: mask(&[ChangeType::Edit]),
            ..get_conflict()
        };
        assert!(is_mergeable(&conflict));
    }

    #[test]
    fn test_your_local_change_counts_for_first_clause() {
        let conflict = Conflict {
            your_local_change: mask(&[ChangeType::Rename]),
            base_change: mask(&[ChangeType::Edit]),
            ..get_conflict()
        };
        assert!(is_mergeable(&conflict));
    }

    #[test]
    fn test_namespace_conflict_not_mergeable() {
        let conflict = Conflict {
            name_conflict: true,
            your_change: mask(&[ChangeType::Edit, ChangeType::Rename]),
            base_change: mask(&[ChangeType::Edit]),
            ..get_conflict()
        };
        assert!(!is_mergeable(&conflict));

        // The name-conflict flag only makes a namespace conflict for get/checkin.
        let merge = Conflict {
            conflict_type: ConflictType::Merge,
            ..conflict
        };
        assert!(is_mergeable(&merge));
    }

    #[test]
    fn test_merge_with_local_edit_mergeable_regardless_of_versions() {
        for (tlm, b, ylm, y) in [(1, 1, 2, 2), (5, 1, 2, 9), (0, 0, 0, 0)] {
            let conflict = Conflict {
                conflict_type: ConflictType::Merge,
                base_change: mask(&[ChangeType::Edit]),
                your_local_change: mask(&[ChangeType::Edit]),
                target_local_modified_version: tlm,
                base_version: b,
                your_local_modified_version: ylm,
                your_version: y,
                ..get_conflict()
            };
            assert!(is_mergeable(&conflict));
        }
    }

    #[test]
    fn test_merge_clause_variants() {
        let base = Conflict {
            conflict_type: ConflictType::Merge,
            base_change: mask(&[ChangeType::Edit]),
            base_version: 3,
            target_local_modified_version: 3,
            your_version: 4,
            your_local_modified_version: 4,
            ..get_conflict()
        };
        assert!(!is_mergeable(&base));

        assert!(is_mergeable(&Conflict {
            forced: true,
            ..base.clone()
        }));
        assert!(is_mergeable(&Conflict {
            target_local_modified_version: 5,
            ..base.clone()
        }));
        assert!(is_mergeable(&Conflict {
            your_local_modified_version: 1,
            ..base.clone()
        }));
        assert!(!is_mergeable(&Conflict {
            item_type: ItemType::Folder,
            forced: true,
            ..base
        }));
    }

    #[test]
    fn test_name_and_content_predicates() {
        let renamed = Conflict {
            base_change: mask(&[ChangeType::Rename]),
            ..get_conflict()
        };
        assert!(is_name_conflict(&renamed));
        assert!(!is_content_conflict(&renamed));

        let edited = Conflict {
            your_change: mask(&[ChangeType::Edit]),
            ..get_conflict()
        };
        assert!(!is_name_conflict(&edited));
        assert!(is_content_conflict(&edited));

        // Local-only change masks do not count.
        let local_only = Conflict {
            your_local_change: mask(&[ChangeType::Edit, ChangeType::Rename]),
            ..get_conflict()
        };
        assert!(!is_name_conflict(&local_only));
        assert!(!is_content_conflict(&local_only));
    }
}
