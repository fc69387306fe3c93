use std::{cell::RefCell, rc::Rc};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    path,
    stream::{FilteredStream, MappedStream, ValueStream},
};

use super::{
    StoreError,
    index::{IndexEntry, PathIndex},
    subscription::{Subscription, ValueCallback},
};

/// The top-level state mapping held by a [`Store`].
pub type StoreState = Map<String, Value>;

/// An observable, path-addressable state container.
///
/// A store holds one JSON-shaped state object, mutated only by whole-object
/// shallow merge. Consumers register callbacks against the whole state
/// ([`subscribe`](Store::subscribe)) or against a dotted/bracketed path
/// ([`on`](Store::on), [`watch`](Store::watch)); path callbacks fire only
/// when the resolved value at their path actually changes.
///
/// Dispatch is fully synchronous: every matching callback has run before
/// [`update`](Store::update) returns, in registration order. The store is
/// single-threaded by design; callers on multiple threads must serialize
/// access themselves.
pub struct Store {
    stream: ValueStream<StoreState>,
    index: Rc<RefCell<PathIndex>>,
}

impl Store {
    /// Creates a store starting from an empty state.
    pub fn new() -> Self {
        Self::with_state(StoreState::new())
    }

    /// Creates a store that takes ownership of `initial` as its starting
    /// state.
    pub fn with_state(initial: StoreState) -> Self {
        Self {
            stream: ValueStream::new(initial),
            index: Rc::new(RefCell::new(PathIndex::default())),
        }
    }

    /// Shallow-merges `partial` into the current state and notifies
    /// subscribers.
    ///
    /// Keys present in `partial` overwrite the current top-level entries;
    /// every other key is retained. Values are not validated or merged any
    /// deeper than the top level. All matching callbacks have run by the
    /// time this returns; a panicking callback propagates to the caller and
    /// aborts dispatch to later subscribers.
    pub fn update(&self, partial: StoreState) {
        let mut next = self.stream.get();
        for (key, value) in partial {
            next.insert(key, value);
        }

        debug!(keys = next.len(), "publishing merged state");
        self.stream.publish(next);
    }

    /// Returns a clone of the current state snapshot.
    pub fn get_state(&self) -> StoreState {
        self.stream.get()
    }

    /// Reads the value at `path`, or `None` when the path resolves to
    /// nothing.
    ///
    /// Absent, out-of-range, and malformed paths all read as `None`; this
    /// never fails.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.stream
            .with_current(|state| path::resolve_in(state, path).cloned())
    }

    /// Reads the value at `path`, falling back to `fallback` when absent.
    pub fn get_or(&self, path: &str, fallback: Value) -> Value {
        self.get(path).unwrap_or(fallback)
    }

    /// Strict read: errors instead of falling back.
    ///
    /// # Errors
    /// Returns [`StoreError::PathNotFound`] when `path` resolves to
    /// nothing.
    pub fn try_get(&self, path: &str) -> Result<Value, StoreError> {
        self.get(path).ok_or_else(|| StoreError::PathNotFound {
            path: path.to_string(),
        })
    }

    /// Reads the value at `path` and deserializes it into `T`.
    ///
    /// # Errors
    /// Returns [`StoreError::PathNotFound`] when the path resolves to
    /// nothing, or [`StoreError::TypeMismatch`] when the stored value does
    /// not deserialize into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let value = self.try_get(path)?;

        T::deserialize(value.clone()).map_err(|_| StoreError::TypeMismatch {
            path: path.to_string(),
            expected: std::any::type_name::<T>(),
            value,
        })
    }

    /// Registers `callback` to run on every update, with no change
    /// filtering.
    ///
    /// The callback observes the current state once immediately, then every
    /// published state, including publishes that change nothing. This
    /// registration is not entered into the path index; the returned
    /// handle's `unsubscribe` is the only way to stop delivery.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&StoreState) + 'static,
    {
        let id = self.index.borrow_mut().next_id();
        let handle = self.stream.observe(callback);

        Subscription::new(id, None, handle, None)
    }

    /// Registers `callback` to fire when the value at `path` changes.
    ///
    /// The callback receives just the resolved value (`None` when the path
    /// resolves to nothing). It fires once immediately at registration with
    /// the current value; after that, an update fires it only when the
    /// resolved value differs from the last one delivered. Equality is
    /// structural on the leaf value, not on anything above it.
    ///
    /// The registration is appended to the path index, so it can later be
    /// removed either through the returned handle or through
    /// [`off`](Store::off) with a clone of the same callback.
    pub fn on(&self, path: &str, callback: ValueCallback) -> Subscription {
        let id = self.index.borrow_mut().next_id();

        let dispatch = Rc::clone(&callback);
        let handle = self
            .value_stream(path)
            .observe(move |value: &Option<Value>| {
                (dispatch.borrow_mut())(value.as_ref());
            });

        self.index.borrow_mut().append(
            path,
            IndexEntry {
                id,
                callback,
                handle: handle.clone(),
            },
        );

        Subscription::new(
            id,
            Some(path.to_string()),
            handle,
            Some(Rc::downgrade(&self.index)),
        )
    }

    /// Removes the first registration of `callback` at `path`.
    ///
    /// Matching is by callback allocation identity; when the same callback
    /// is registered more than once at a path, only the earliest
    /// registration is removed per call. A miss, including a path with no
    /// registrations at all, logs a warning and returns an empty sequence;
    /// it never fails and never disturbs other registrations.
    pub fn off(&self, path: &str, callback: &ValueCallback) -> Vec<Subscription> {
        let removed = {
            let mut index = self.index.borrow_mut();
            index
                .find_by_callback(path, callback)
                .and_then(|id| index.remove(path, id))
        };

        let Some(entry) = removed else {
            warn!(path, "no matching subscription to remove");
            return Vec::new();
        };

        entry.handle.unsubscribe();
        vec![Subscription::new(
            entry.id,
            Some(path.to_string()),
            entry.handle,
            None,
        )]
    }

    /// Like [`on`](Store::on), but the callback receives the entire new
    /// state whenever the value at `path` changes.
    ///
    /// Watch registrations are not entered into the path index and are not
    /// reachable through [`off`](Store::off); the returned handle's
    /// `unsubscribe` is the only way to stop delivery.
    pub fn watch<F>(&self, path: &str, callback: F) -> Subscription
    where
        F: FnMut(&StoreState) + 'static,
    {
        let id = self.index.borrow_mut().next_id();
        let handle = self.state_stream(path).observe(callback);

        Subscription::new(id, Some(path.to_string()), handle, None)
    }

    /// Derives the state-carrying stream for `path`.
    ///
    /// An empty path disables filtering entirely: the stream fires on every
    /// publish. Otherwise publishes are suppressed while the resolved value
    /// at `path` stays equal to the last delivered one.
    pub fn state_stream(&self, path: &str) -> FilteredStream<StoreState> {
        if path.is_empty() {
            self.stream.distinct_until_changed(|_, _| false)
        } else {
            let path = path.to_string();
            self.stream.distinct_until_changed(move |prev, curr| {
                path::resolve_in(prev, &path) == path::resolve_in(curr, &path)
            })
        }
    }

    /// Like [`state_stream`](Store::state_stream), projected down to just
    /// the resolved value at `path`.
    pub fn value_stream(&self, path: &str) -> MappedStream<StoreState, Option<Value>> {
        let leaf = path.to_string();
        self.state_stream(path)
            .map(move |state| path::resolve_in(state, &leaf).cloned())
    }

    /// Number of live path-index entries at `path`. Whole-state and watch
    /// subscriptions are not counted.
    pub fn subscription_count(&self, path: &str) -> usize {
        self.index.borrow().len_at(path)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
