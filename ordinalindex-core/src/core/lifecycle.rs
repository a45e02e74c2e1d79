//! Lifecycle state machine driving the ordinal index from a cold start
//! through bulk recreation into live tracking.

/// `Uninitialized -> Loading -> Indexing -> Live`, with an orthogonal
/// *recreate* flag tracked alongside rather than folded into the enum —
/// recreate can be entered from `Loading` and is cleared without changing
/// the surrounding state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Loading,
    Indexing,
    Live,
}

#[derive(Debug)]
pub struct Lifecycle {
    pub state: IndexState,
    pub recreate: bool,
}

impl Lifecycle {
    pub fn new() -> Lifecycle {
        Lifecycle {
            state: IndexState::Uninitialized,
            recreate: false,
        }
    }

    pub fn enter_loading(&mut self) {
        self.state = IndexState::Loading;
    }

    pub fn force_recreate(&mut self) {
        self.recreate = true;
    }

    pub fn enter_indexing(&mut self) {
        self.state = IndexState::Indexing;
    }

    pub fn finish_indexing(&mut self) {
        self.recreate = false;
        self.state = IndexState::Live;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::new()
    }
}
