use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use serde_json::Value;

use crate::stream::StreamHandle;

use super::index::PathIndex;

/// A shared callback invoked with the resolved value at a path.
///
/// Path callbacks are reference-counted so that [`off`](super::Store::off)
/// can find a registration again by allocation identity. Build one with
/// [`value_callback`], keep a clone, and hand another clone to
/// [`on`](super::Store::on).
pub type ValueCallback = Rc<RefCell<dyn FnMut(Option<&Value>)>>;

/// Wraps a closure into the shared-callback form accepted by
/// [`on`](super::Store::on) and [`off`](super::Store::off).
pub fn value_callback<F>(callback: F) -> ValueCallback
where
    F: FnMut(Option<&Value>) + 'static,
{
    Rc::new(RefCell::new(callback))
}

/// Handle to one live callback registration.
///
/// Dropping the handle does not tear the registration down; delivery stops
/// only through [`Subscription::unsubscribe`] or a matching
/// [`off`](super::Store::off).
pub struct Subscription {
    id: u64,
    path: Option<String>,
    handle: StreamHandle,
    index: Option<Weak<RefCell<PathIndex>>>,
}

impl Subscription {
    pub(super) fn new(
        id: u64,
        path: Option<String>,
        handle: StreamHandle,
        index: Option<Weak<RefCell<PathIndex>>>,
    ) -> Self {
        Self {
            id,
            path,
            handle,
            index,
        }
    }

    /// Stable id of this registration.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The path this subscription was registered for, if any.
    ///
    /// Whole-state subscriptions carry no path.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Stops delivery to this subscription's callback.
    ///
    /// Safe to call more than once; the second and later calls are no-ops.
    /// If [`off`](super::Store::off) already removed the registration, this
    /// is also a no-op.
    pub fn unsubscribe(&self) {
        if let (Some(index), Some(path)) = (&self.index, &self.path) {
            if let Some(index) = index.upgrade() {
                index.borrow_mut().remove(path, self.id);
            }
        }

        self.handle.unsubscribe();
    }
}
