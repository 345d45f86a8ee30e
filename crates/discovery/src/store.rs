//! Ordered, deduplicating endpoint list shared by the poll loop and the UI.
//!
//! Every operation takes the one store lock for at most a linear pass over
//! the list. Readers get copies, never the live sequence.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::strategy::Candidate;
use crate::types::{EndpointLabel, InsertPosition};

/// Point-in-time copy of the store for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreView {
    pub labels: Vec<EndpointLabel>,
    pub selected: Option<usize>,
}

/// Thread-safe ordered collection of endpoint labels with a selection cursor.
///
/// Invariant: `selected` is `None` or a valid index into `labels`.
#[derive(Debug, Default)]
pub struct EndpointStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    labels: VecDeque<EndpointLabel>,
    members: HashSet<EndpointLabel>,
    selected: Option<usize>,
}

impl StoreInner {
    fn insert(
        &mut self,
        label: EndpointLabel,
        allow_duplicates: bool,
        position: InsertPosition,
    ) -> bool {
        if !allow_duplicates && self.members.contains(&label) {
            return false;
        }
        self.members.insert(label.clone());
        match position {
            InsertPosition::Append => self.labels.push_back(label),
            InsertPosition::Prepend => {
                self.labels.push_front(label);
                // Keep the cursor on the same entry.
                if let Some(selected) = self.selected.as_mut() {
                    *selected += 1;
                }
            }
        }
        true
    }

    fn clamp(&self, index: Option<usize>) -> Option<usize> {
        let last = self.labels.len().checked_sub(1)?;
        index.map(|i| i.min(last))
    }
}

impl EndpointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `label` at `position`. Returns false, changing nothing, when
    /// duplicates are not allowed and the label is already present.
    pub fn try_insert(
        &self,
        label: EndpointLabel,
        allow_duplicates: bool,
        position: InsertPosition,
    ) -> bool {
        self.lock().insert(label, allow_duplicates, position)
    }

    /// Inserts a batch of candidates under a single lock, in order, and
    /// returns the labels that were actually inserted.
    pub fn insert_all(
        &self,
        candidates: impl IntoIterator<Item = Candidate>,
        allow_duplicates: bool,
    ) -> Vec<EndpointLabel> {
        self.insert_all_if(candidates, allow_duplicates, || true)
    }

    /// Like [`insert_all`](Self::insert_all), but inserts nothing unless
    /// `still_current` holds once the lock is taken.
    pub fn insert_all_if(
        &self,
        candidates: impl IntoIterator<Item = Candidate>,
        allow_duplicates: bool,
        still_current: impl FnOnce() -> bool,
    ) -> Vec<EndpointLabel> {
        let mut inner = self.lock();
        if !still_current() {
            return Vec::new();
        }
        candidates
            .into_iter()
            .filter_map(|c| {
                inner
                    .insert(c.label.clone(), allow_duplicates, c.position)
                    .then_some(c.label)
            })
            .collect()
    }

    /// Returns a copy of the labels in display order.
    pub fn snapshot(&self) -> Vec<EndpointLabel> {
        self.lock().labels.iter().cloned().collect()
    }

    /// Returns a copy of the set of labels currently held.
    pub fn known_labels(&self) -> HashSet<String> {
        self.lock()
            .members
            .iter()
            .map(|l| l.as_str().to_string())
            .collect()
    }

    /// Returns true if `label` is in the store.
    pub fn contains(&self, label: &EndpointLabel) -> bool {
        self.lock().members.contains(label)
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.lock().labels.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().labels.is_empty()
    }

    /// Removes every label and clears the selection.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.labels.clear();
        inner.members.clear();
        inner.selected = None;
    }

    /// Sets the selection, clamped to the last entry. An empty store always
    /// ends up with no selection. Returns the resulting selection.
    pub fn set_selection(&self, index: Option<usize>) -> Option<usize> {
        let mut inner = self.lock();
        inner.selected = inner.clamp(index);
        inner.selected
    }

    /// Returns the current selection.
    pub fn selection(&self) -> Option<usize> {
        self.lock().selected
    }

    /// Returns the selected label, if any.
    pub fn selected_label(&self) -> Option<EndpointLabel> {
        let inner = self.lock();
        inner.selected.and_then(|i| inner.labels.get(i).cloned())
    }

    /// Returns the IP portion of the selected label, if any.
    pub fn selected_address(&self) -> Option<String> {
        self.selected_label().map(|l| l.address().to_string())
    }

    /// Returns the labels and selection for rendering.
    ///
    /// A non-empty store with nothing selected selects the first entry.
    pub fn view(&self) -> StoreView {
        let mut inner = self.lock();
        if inner.selected.is_none() && !inner.labels.is_empty() {
            inner.selected = Some(0);
        }
        StoreView {
            labels: inner.labels.iter().cloned().collect(),
            selected: inner.selected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn label(s: &str) -> EndpointLabel {
        EndpointLabel::new(s)
    }

    fn texts(store: &EndpointStore) -> Vec<String> {
        store.snapshot().into_iter().map(String::from).collect()
    }

    #[test]
    fn dedup_keeps_each_label_once() {
        let store = EndpointStore::new();
        let proposals = ["a:1", "b:2", "a:1", "c:3", "b:2", "a:1"];
        let inserted: Vec<bool> = proposals
            .iter()
            .map(|p| store.try_insert(label(p), false, InsertPosition::Append))
            .collect();
        assert_eq!(inserted, vec![true, true, false, true, false, false]);
        assert_eq!(texts(&store), vec!["a:1", "b:2", "c:3"]);
    }

    #[test]
    fn duplicates_kept_verbatim_when_allowed() {
        let store = EndpointStore::new();
        for p in ["a:1", "a:1", "b:2"] {
            assert!(store.try_insert(label(p), true, InsertPosition::Append));
        }
        assert_eq!(texts(&store), vec!["a:1", "a:1", "b:2"]);
    }

    #[test]
    fn append_preserves_discovery_order() {
        let store = EndpointStore::new();
        for p in ["e1:1", "e2:2", "e3:3"] {
            store.try_insert(label(p), false, InsertPosition::Append);
        }
        assert_eq!(texts(&store), vec!["e1:1", "e2:2", "e3:3"]);
    }

    #[test]
    fn prepend_reverses_order() {
        let store = EndpointStore::new();
        for p in ["e1:1", "e2:2", "e3:3"] {
            store.try_insert(label(p), false, InsertPosition::Prepend);
        }
        assert_eq!(texts(&store), vec!["e3:3", "e2:2", "e1:1"]);
    }

    #[test]
    fn insert_all_reports_inserted_labels() {
        let store = EndpointStore::new();
        store.try_insert(label("a:1"), false, InsertPosition::Append);
        let inserted = store.insert_all(
            vec![
                Candidate::append(label("a:1")),
                Candidate::append(label("b:2")),
                Candidate::prepend(label("c:3")),
            ],
            false,
        );
        assert_eq!(inserted, vec![label("b:2"), label("c:3")]);
        assert_eq!(texts(&store), vec!["c:3", "a:1", "b:2"]);
    }

    #[test]
    fn clear_resets_everything() {
        let store = EndpointStore::new();
        store.try_insert(label("a:1"), false, InsertPosition::Append);
        store.set_selection(Some(0));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.selection(), None);
        assert!(!store.contains(&label("a:1")));
        // Membership is gone too, so the label can come back.
        assert!(store.try_insert(label("a:1"), false, InsertPosition::Append));
    }

    #[test]
    fn selection_clamps() {
        let store = EndpointStore::new();
        assert_eq!(store.set_selection(Some(3)), None);

        for p in ["a:1", "b:2", "c:3"] {
            store.try_insert(label(p), false, InsertPosition::Append);
        }
        assert_eq!(store.set_selection(Some(1)), Some(1));
        assert_eq!(store.set_selection(Some(99)), Some(2));
        assert_eq!(store.set_selection(None), None);
    }

    #[test]
    fn view_defaults_selection_to_first() {
        let store = EndpointStore::new();
        assert_eq!(store.view().selected, None);

        store.try_insert(label("a:1"), false, InsertPosition::Append);
        store.try_insert(label("b:2"), false, InsertPosition::Append);
        assert_eq!(store.selection(), None);

        let view = store.view();
        assert_eq!(view.selected, Some(0));
        assert_eq!(view.labels.len(), 2);
        assert_eq!(store.selection(), Some(0));
    }

    #[test]
    fn selected_address_for_both_shapes() {
        let store = EndpointStore::new();
        assert_eq!(store.selected_address(), None);

        store.try_insert(label("Foo (1.2.3.4:7777)"), false, InsertPosition::Append);
        store.try_insert(label("5.6.7.8:7777"), false, InsertPosition::Append);

        store.set_selection(Some(0));
        assert_eq!(store.selected_address().as_deref(), Some("1.2.3.4"));
        store.set_selection(Some(1));
        assert_eq!(store.selected_address().as_deref(), Some("5.6.7.8"));
        assert_eq!(store.selected_label(), Some(label("5.6.7.8:7777")));
    }

    #[test]
    fn prepend_keeps_selection_on_same_entry() {
        let store = EndpointStore::new();
        store.try_insert(label("Foo (1.2.3.4:7777)"), false, InsertPosition::Prepend);
        store.try_insert(label("Foo (5.6.7.8:7777)"), false, InsertPosition::Prepend);
        store.set_selection(Some(1));

        store.try_insert(label("9.9.9.9:7777"), false, InsertPosition::Prepend);
        assert_eq!(store.selection(), Some(2));
        assert_eq!(store.selected_address().as_deref(), Some("1.2.3.4"));

        // Appends and rejected duplicates leave the cursor alone.
        store.try_insert(label("8.8.8.8:7777"), false, InsertPosition::Append);
        store.try_insert(label("9.9.9.9:7777"), false, InsertPosition::Prepend);
        assert_eq!(store.selection(), Some(2));
    }

    #[test]
    fn prepend_without_selection_stays_unselected() {
        let store = EndpointStore::new();
        store.try_insert(label("a:1"), false, InsertPosition::Prepend);
        store.try_insert(label("b:2"), false, InsertPosition::Prepend);
        assert_eq!(store.selection(), None);
    }

    #[test]
    fn known_labels_copies_membership() {
        let store = EndpointStore::new();
        store.try_insert(label("a:1"), false, InsertPosition::Append);
        let known = store.known_labels();
        store.clear();
        assert!(known.contains("a:1"));
    }

    #[test]
    fn concurrent_inserts_stay_deduplicated() {
        let store = Arc::new(EndpointStore::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.try_insert(label(&format!("10.0.0.{i}:7777")), false, InsertPosition::Append);
                        let _ = store.snapshot();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 50);
    }
}
