//! Added/removed document sets across message edits.

use crate::document::Document;

/// Splits an edit into documents to add and documents to remove.
///
/// A missing previous set means everything is new.
pub fn diff(
    current: &[Document],
    previous: Option<&[Document]>,
) -> (Vec<Document>, Vec<Document>) {
    match previous {
        Some(previous) => (subtract(current, previous), subtract(previous, current)),
        None => (current.to_vec(), Vec::new()),
    }
}

/// Documents in `left` with no structurally equal counterpart in `right`.
pub fn subtract(left: &[Document], right: &[Document]) -> Vec<Document> {
    left.iter()
        .filter(|doc| !right.contains(doc))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{timestamp_from_epoch, DocumentMetadata};

    fn doc(id: &str, content: &str) -> Document {
        Document {
            content: content.into(),
            metadata: DocumentMetadata {
                file_or_attachment_id: id.into(),
                content_type: "unfurling_link".into(),
                channel_type: "channel".into(),
                channel_id: "C1".into(),
                thread_ts: "0000000000.000000".into(),
                ts: "1.0".into(),
                permalink: "https://x".into(),
                timestamp: timestamp_from_epoch(1_629_470_261).unwrap(),
            },
        }
    }

    #[test]
    fn no_previous_means_all_added() {
        let current = vec![doc("1.0-1", "a"), doc("1.0-2", "b")];
        let (added, removed) = diff(&current, None);
        assert_eq!(added, current);
        assert!(removed.is_empty());
    }

    #[test]
    fn edit_gaining_a_link_adds_only_the_link() {
        let previous = vec![doc("1.0-1", "a")];
        let current = vec![doc("1.0-1", "a"), doc("1.0-2", "b")];
        let (added, removed) = diff(&current, Some(&previous));
        assert_eq!(added, vec![doc("1.0-2", "b")]);
        assert!(removed.is_empty());
    }

    #[test]
    fn edit_losing_a_link_removes_it() {
        let previous = vec![doc("1.0-1", "a"), doc("1.0-2", "b")];
        let current = vec![doc("1.0-1", "a")];
        let (added, removed) = diff(&current, Some(&previous));
        assert!(added.is_empty());
        assert_eq!(removed, vec![doc("1.0-2", "b")]);
    }

    #[test]
    fn content_change_counts_as_remove_and_add() {
        let previous = vec![doc("1.0-1", "old text")];
        let current = vec![doc("1.0-1", "new text")];
        let (added, removed) = diff(&current, Some(&previous));
        assert_eq!(added, vec![doc("1.0-1", "new text")]);
        assert_eq!(removed, vec![doc("1.0-1", "old text")]);
    }

    #[test]
    fn identical_sets_change_nothing() {
        let docs = vec![doc("1.0-1", "a")];
        let (added, removed) = diff(&docs, Some(&docs));
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }
}
