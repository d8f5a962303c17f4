//! Check-in note fields and required-note validation.

use serde::Serialize;

use crate::proxy::CheckinNoteFieldDefinition;

/// A server-declared note field together with the value the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckinNote {
    pub name: String,
    pub required: bool,
    pub value: Option<String>,
}

impl CheckinNote {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            value: None,
        }
    }

    /// Required and absent or blank.
    pub fn is_missing(&self) -> bool {
        self.required
            && self
                .value
                .as_deref()
                .map_or(true, |v| v.trim().is_empty())
    }
}

/// Merge definitions coming from several team projects.
///
/// Definitions are keyed by name; a required declaration replaces a
/// non-required one. The result is ordered by display order, ties keeping
/// first-seen order.
pub fn factorize_definitions(definitions: &[CheckinNoteFieldDefinition]) -> Vec<CheckinNote> {
    let mut merged: Vec<&CheckinNoteFieldDefinition> = Vec::new();
    for definition in definitions {
        match merged.iter_mut().find(|d| d.name == definition.name) {
            Some(slot) => {
                if definition.required {
                    *slot = definition;
                }
            }
            None => merged.push(definition),
        }
    }
    merged.sort_by_key(|d| d.display_order);
    merged
        .into_iter()
        .map(|d| CheckinNote::new(d.name.clone(), d.required))
        .collect()
}

/// Names of required notes without a value, in note order.
pub fn empty_note_names(notes: &[CheckinNote]) -> Vec<String> {
    notes
        .iter()
        .filter(|note| note.is_missing())
        .map(|note| note.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, required: bool, display_order: i32) -> CheckinNoteFieldDefinition {
        CheckinNoteFieldDefinition {
            name: name.into(),
            required,
            display_order,
        }
    }

    #[test]
    fn test_required_wins_and_sorted() {
        let notes = factorize_definitions(&[
            definition("Security Reviewer", false, 2),
            definition("Code Reviewer", false, 1),
            definition("Security Reviewer", true, 5),
            definition("Code Reviewer", false, 0),
        ]);
        let names: Vec<_> = notes.iter().map(|n| (n.name.as_str(), n.required)).collect();
        assert_eq!(
            names,
            vec![("Code Reviewer", false), ("Security Reviewer", true)]
        );
    }

    #[test]
    fn test_empty_note_names() {
        let mut notes = vec![CheckinNote::new("Reviewer", true), CheckinNote::new("Ticket", false)];
        assert_eq!(empty_note_names(&notes), vec!["Reviewer".to_string()]);

        notes[0].value = Some("  ".into());
        assert_eq!(empty_note_names(&notes), vec!["Reviewer".to_string()]);

        notes[0].value = Some("alice".into());
        assert!(empty_note_names(&notes).is_empty());
    }
}
