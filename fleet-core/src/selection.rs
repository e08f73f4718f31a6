//! Selection Tracker (spec.md §4.7, §5): preserves the user's focused
//! resource identity across `RowSnapshot` recomputations caused by
//! refresh churn, re-sorts, insertions, deletions, and context-filter
//! toggles.
//!
//! A single mutex guards `(focused_identity, current_snapshot)`
//! together, per spec.md §5's locking discipline, so a reader never
//! observes a focused identity paired with a snapshot it doesn't belong
//! to.

use parking_lot::Mutex;

use fleet_model::{ResourceIdentity, RowSnapshot, Selection};

struct State {
    selection: Selection,
    /// The focused row's index in the *last* snapshot it was known to
    /// be in — the input to the index-preservation fallback (spec.md
    /// §4.7 step 3) when the focused identity has vanished from the new
    /// snapshot entirely (e.g. deletion).
    last_index: Option<usize>,
    snapshot: RowSnapshot,
}

pub struct SelectionTracker {
    state: Mutex<State>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                selection: Selection::none(),
                last_index: None,
                snapshot: RowSnapshot::empty("NAME", fleet_model::SortDirection::Ascending),
            }),
        }
    }

    /// Explicitly focuses `identity`, if it names a row in the current
    /// snapshot. A no-op (leaves focus unchanged) when it doesn't —
    /// callers should pick from the current snapshot, not fabricate an
    /// identity out of thin air.
    pub fn focus(&self, identity: &ResourceIdentity) {
        let mut state = self.state.lock();
        if let Some(index) = state.snapshot.index_of(identity) {
            state.selection = Selection::focused(state.snapshot.rows[index].identity.clone());
            state.last_index = Some(index);
        }
    }

    pub fn focused(&self) -> Option<ResourceIdentity> {
        self.state.lock().selection.focused_identity.clone()
    }

    pub fn focused_index(&self) -> Option<usize> {
        let state = self.state.lock();
        state
            .selection
            .focused_identity
            .as_ref()
            .and_then(|id| state.snapshot.index_of(id))
    }

    /// Applies a new `RowSnapshot`, running the selection stability
    /// policy (spec.md §4.7):
    ///
    /// 1. identity match (uid, or the 4-tuple fallback — both folded
    ///    into `ResourceIdentity::eq`, so this is one lookup);
    /// 2. index preservation, clamped to the last row, when the
    ///    identity is gone but the snapshot isn't empty;
    /// 3. clear focus when the new snapshot is empty.
    ///
    /// A snapshot update with no prior focus leaves focus unset; the
    /// caller establishes the first focus explicitly via `focus`.
    pub fn update(&self, new_snapshot: RowSnapshot) {
        let mut state = self.state.lock();

        let next = match state.selection.focused_identity.clone() {
            None => (None, None),
            Some(focused) => match new_snapshot.index_of(&focused) {
                Some(index) => (Some(new_snapshot.rows[index].identity.clone()), Some(index)),
                None if new_snapshot.is_empty() => (None, None),
                None => {
                    let index = state
                        .last_index
                        .map(|i| i.min(new_snapshot.len() - 1))
                        .unwrap_or(0);
                    (Some(new_snapshot.rows[index].identity.clone()), Some(index))
                }
            },
        };

        state.selection = Selection {
            focused_identity: next.0,
        };
        state.last_index = next.1;
        state.snapshot = new_snapshot;
    }

    pub fn snapshot(&self) -> RowSnapshot {
        self.state.lock().snapshot.clone()
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::{Row, ResourceKind, SortDirection};

    fn row(name: &str, uid: &str) -> Row {
        Row {
            cells: vec![name.to_string()],
            identity: ResourceIdentity::new("prod", "default", ResourceKind::Pod, name, Some(uid.to_string())),
        }
    }

    fn snapshot(rows: Vec<Row>) -> RowSnapshot {
        RowSnapshot {
            rows,
            sort_column: "NAME".to_string(),
            sort_direction: SortDirection::Ascending,
        }
    }

    #[test]
    fn status_update_with_unchanged_order_keeps_focus() {
        let tracker = SelectionTracker::new();
        let initial = snapshot(vec![row("pod-a", "u-a"), row("pod-b", "u-b"), row("pod-c", "u-c")]);
        tracker.update(initial);
        tracker.focus(&ResourceIdentity::new("prod", "default", ResourceKind::Pod, "pod-b", Some("u-b".into())));
        assert_eq!(tracker.focused_index(), Some(1));

        // Same order, same uids: a pure field update.
        let refreshed = snapshot(vec![row("pod-a", "u-a"), row("pod-b", "u-b"), row("pod-c", "u-c")]);
        tracker.update(refreshed);
        assert_eq!(tracker.focused_index(), Some(1));
        assert_eq!(tracker.focused().unwrap().uid.as_deref(), Some("u-b"));
    }

    #[test]
    fn resort_follows_focused_identity_to_new_index() {
        let tracker = SelectionTracker::new();
        tracker.update(snapshot(vec![row("pod-a", "u-a"), row("pod-b", "u-b"), row("pod-c", "u-c")]));
        tracker.focus(&ResourceIdentity::new("prod", "default", ResourceKind::Pod, "pod-b", Some("u-b".into())));

        let resorted = snapshot(vec![row("pod-a", "u-a"), row("pod-c", "u-c"), row("pod-b", "u-b")]);
        tracker.update(resorted);
        assert_eq!(tracker.focused_index(), Some(2));
    }

    #[test]
    fn deletion_moves_focus_to_same_index_not_top() {
        let tracker = SelectionTracker::new();
        tracker.update(snapshot(vec![row("pod-a", "u-a"), row("pod-b", "u-b"), row("pod-c", "u-c")]));
        tracker.focus(&ResourceIdentity::new("prod", "default", ResourceKind::Pod, "pod-b", Some("u-b".into())));

        // pod-b deleted; pod-c shifts up to index 1.
        let after_delete = snapshot(vec![row("pod-a", "u-a"), row("pod-c", "u-c")]);
        tracker.update(after_delete);
        assert_eq!(tracker.focused_index(), Some(1));
        assert_eq!(tracker.focused().unwrap().name, "pod-c");
    }

    #[test]
    fn deletion_of_last_row_clamps_to_new_last() {
        let tracker = SelectionTracker::new();
        tracker.update(snapshot(vec![row("pod-a", "u-a"), row("pod-b", "u-b"), row("pod-c", "u-c")]));
        tracker.focus(&ResourceIdentity::new("prod", "default", ResourceKind::Pod, "pod-c", Some("u-c".into())));

        let after_delete = snapshot(vec![row("pod-a", "u-a"), row("pod-b", "u-b")]);
        tracker.update(after_delete);
        assert_eq!(tracker.focused_index(), Some(1));
        assert_eq!(tracker.focused().unwrap().name, "pod-b");
    }

    #[test]
    fn empty_snapshot_clears_focus() {
        let tracker = SelectionTracker::new();
        tracker.update(snapshot(vec![row("pod-a", "u-a")]));
        tracker.focus(&ResourceIdentity::new("prod", "default", ResourceKind::Pod, "pod-a", Some("u-a".into())));

        tracker.update(snapshot(vec![]));
        assert!(tracker.focused().is_none());
    }

    #[test]
    fn multi_context_interleave_keeps_focus_on_status_only_refresh() {
        let tracker = SelectionTracker::new();
        let ctxs = ["alpha", "beta", "staging"];
        let rows: Vec<Row> = (0..9)
            .map(|i| Row {
                cells: vec![format!("pod-{i}")],
                identity: ResourceIdentity::new(
                    ctxs[i % 3],
                    "default",
                    ResourceKind::Pod,
                    format!("database-{}", i / 3),
                    Some(format!("u-{i}")),
                ),
            })
            .collect();
        tracker.update(snapshot(rows.clone()));
        let target = rows
            .iter()
            .find(|r| r.identity.context == "staging" && r.identity.name == "database-2")
            .unwrap()
            .identity
            .clone();
        tracker.focus(&target);
        let idx_before = tracker.focused_index().unwrap();

        // Rows unchanged in order (a status-only refresh).
        tracker.update(snapshot(rows));
        assert_eq!(tracker.focused_index(), Some(idx_before));
        let focused = tracker.focused().unwrap();
        assert_eq!(focused.context, "staging");
        assert_eq!(focused.name, "database-2");
    }
}
