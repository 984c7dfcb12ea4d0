use crate::dashboard::store::PreferenceStore;

/// Move the element at `source` to `destination`, shifting the elements in
/// between by one position.
///
/// # Panics
///
/// Panics when either index is out of bounds. Indices come from the drag
/// source, so a bad index is a caller bug.
pub fn reorder<T: Clone>(ordering: &[T], source: usize, destination: usize) -> Vec<T> {
    assert!(
        source < ordering.len(),
        "reorder source index {source} out of bounds for {} widgets",
        ordering.len()
    );
    assert!(
        destination < ordering.len(),
        "reorder destination index {destination} out of bounds for {} widgets",
        ordering.len()
    );
    let mut result = ordering.to_vec();
    if source != destination {
        let item = result.remove(source);
        result.insert(destination, item);
    }
    result
}

/// Reorder the store's ordering and commit it. The store normalizes the
/// result, so adjacency rules still hold afterwards.
pub fn apply_reorder(store: &mut PreferenceStore, source: usize, destination: usize) -> bool {
    if source == destination {
        return false;
    }
    store.mutate(|mut prefs| {
        prefs.order = reorder(&prefs.order, source, destination);
        prefs
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Committed { source: usize, destination: usize },
    Cancelled,
    /// No drag was in progress.
    Ignored,
}

/// Drag gesture state machine: `Idle -> Dragging -> Idle`.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn dragging(&self) -> Option<usize> {
        match self.state {
            DragState::Dragging { source } => Some(source),
            DragState::Idle => None,
        }
    }

    /// Begin dragging the widget at `source`. A drag already in progress is
    /// replaced.
    pub fn start(&mut self, source: usize) {
        tracing::trace!(source, "dashboard.drag_start");
        self.state = DragState::Dragging { source };
    }

    pub fn cancel(&mut self) -> DragOutcome {
        match std::mem::take(&mut self.state) {
            DragState::Dragging { source } => {
                tracing::debug!(source, "dashboard.drag_cancel");
                DragOutcome::Cancelled
            }
            DragState::Idle => DragOutcome::Ignored,
        }
    }

    /// Finish the gesture. `None` means the pointer was released outside any
    /// drop target, which cancels the drag.
    pub fn drop_on(&mut self, destination: Option<usize>) -> DragOutcome {
        let Some(destination) = destination else {
            return self.cancel();
        };
        match std::mem::take(&mut self.state) {
            DragState::Dragging { source } => {
                tracing::debug!(source, destination, "dashboard.drag_commit");
                DragOutcome::Committed {
                    source,
                    destination,
                }
            }
            DragState::Idle => DragOutcome::Ignored,
        }
    }

    /// Finish the gesture and, when committed, apply the move to `store`.
    /// Returns `true` when the stored ordering changed.
    pub fn drop_into(&mut self, store: &mut PreferenceStore, destination: Option<usize>) -> bool {
        match self.drop_on(destination) {
            DragOutcome::Committed {
                source,
                destination,
            } => apply_reorder(store, source, destination),
            DragOutcome::Cancelled | DragOutcome::Ignored => false,
        }
    }
}
