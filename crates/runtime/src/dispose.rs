use std::cell::Cell;
use std::rc::Rc;

/// Shared "has the owner been torn down" flag.
///
/// Clones observe the same flag. Work that outlives its owner (an async
/// location request, a renderer callback) checks the token before touching
/// the owner and drops its result once the token is disposed.
#[derive(Debug, Clone, Default)]
pub struct DisposeToken {
    disposed: Rc<Cell<bool>>,
}

impl DisposeToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` on the first call only.
    pub fn dispose(&self) -> bool {
        !self.disposed.replace(true)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Whether both tokens were cloned from the same original.
    pub fn same_as(&self, other: &DisposeToken) -> bool {
        Rc::ptr_eq(&self.disposed, &other.disposed)
    }
}
