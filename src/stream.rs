use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

struct ObserverSlot<T> {
    id: u64,
    // Taken out of the slot while its callback runs so the callback can
    // re-enter the stream (read, publish, attach, detach) without tripping
    // the RefCell.
    observer: Option<Box<dyn FnMut(&T)>>,
}

struct StreamCore<T> {
    current: T,
    observers: Vec<ObserverSlot<T>>,
    next_id: u64,
}

/// A push-based stream that always holds a current value.
///
/// New observers hear the current value synchronously at attach time, then
/// every published value, in attach order. `publish` returns only after all
/// observer callbacks have run.
pub struct ValueStream<T> {
    core: Rc<RefCell<StreamCore<T>>>,
}

impl<T> Clone for ValueStream<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> ValueStream<T> {
    /// Creates a stream holding `initial` as its current value.
    pub fn new(initial: T) -> Self {
        Self {
            core: Rc::new(RefCell::new(StreamCore {
                current: initial,
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.core.borrow().current.clone()
    }

    /// Runs `f` against a borrow of the current value.
    ///
    /// Cheaper than [`ValueStream::get`] when the caller only needs to look.
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.core.borrow().current)
    }

    /// Replaces the current value and notifies every observer.
    ///
    /// Observers run synchronously, in attach order. An observer detached
    /// mid-dispatch is skipped; one attached mid-dispatch first hears its
    /// own replay.
    pub fn publish(&self, value: T) {
        let ids: Vec<u64> = {
            let mut core = self.core.borrow_mut();
            core.current = value;
            core.observers.iter().map(|slot| slot.id).collect()
        };

        for id in ids {
            self.dispatch_to(id);
        }
    }

    /// Attaches `observer` and synchronously replays the current value to it
    /// before returning.
    ///
    /// The returned handle detaches the observer; calling it more than once
    /// is a no-op after the first.
    pub fn observe<F>(&self, observer: F) -> StreamHandle
    where
        F: FnMut(&T) + 'static,
    {
        let id = {
            let mut core = self.core.borrow_mut();
            let id = core.next_id;
            core.next_id += 1;
            core.observers.push(ObserverSlot {
                id,
                observer: Some(Box::new(observer)),
            });
            id
        };

        self.dispatch_to(id);

        StreamHandle::new(&self.core, id)
    }

    /// Derives a stream that suppresses values the comparator reports as
    /// unchanged.
    ///
    /// `compare(prev, curr)` returning `true` means "equal, suppress". The
    /// filter is lazy and per-subscriber: each observer compares against the
    /// last value actually delivered to it, and its first value (the replay)
    /// always passes.
    pub fn distinct_until_changed<C>(&self, compare: C) -> FilteredStream<T>
    where
        C: Fn(&T, &T) -> bool + 'static,
    {
        FilteredStream {
            source: self.clone(),
            compare: Rc::new(compare),
        }
    }

    /// Number of currently attached observers.
    pub fn observer_count(&self) -> usize {
        self.core.borrow().observers.len()
    }

    fn dispatch_to(&self, id: u64) {
        let taken = {
            let mut core = self.core.borrow_mut();
            let value = core.current.clone();
            core.observers
                .iter_mut()
                .find(|slot| slot.id == id)
                .and_then(|slot| slot.observer.take())
                .map(|observer| (observer, value))
        };

        let Some((mut observer, value)) = taken else {
            return;
        };

        observer(&value);

        let mut core = self.core.borrow_mut();
        if let Some(slot) = core.observers.iter_mut().find(|slot| slot.id == id) {
            slot.observer = Some(observer);
        }
    }
}

/// Detach capability for one stream observer.
///
/// Removal goes through the observer's stable id, so unsubscribing twice,
/// or after the observer is already gone, is a safe no-op.
#[derive(Clone)]
pub struct StreamHandle {
    cancel: Rc<dyn Fn()>,
}

impl StreamHandle {
    fn new<T: 'static>(core: &Rc<RefCell<StreamCore<T>>>, id: u64) -> Self {
        let weak: Weak<RefCell<StreamCore<T>>> = Rc::downgrade(core);
        Self {
            cancel: Rc::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.borrow_mut().observers.retain(|slot| slot.id != id);
                }
            }),
        }
    }

    /// Detaches the observer this handle was issued for. Idempotent.
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

/// A [`ValueStream`] filtered per-subscriber by a distinct-until-changed
/// comparator.
pub struct FilteredStream<T> {
    source: ValueStream<T>,
    compare: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T> Clone for FilteredStream<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            compare: Rc::clone(&self.compare),
        }
    }
}

impl<T: Clone + 'static> FilteredStream<T> {
    /// Attaches `observer` behind the filter.
    ///
    /// The replay at attach time always passes; after that, values the
    /// comparator reports equal to the last delivered one are dropped.
    pub fn observe<F>(&self, mut observer: F) -> StreamHandle
    where
        F: FnMut(&T) + 'static,
    {
        let compare = Rc::clone(&self.compare);
        let mut last_delivered: Option<T> = None;

        self.source.observe(move |value| {
            let unchanged = last_delivered
                .as_ref()
                .is_some_and(|prev| compare(prev, value));

            if !unchanged {
                last_delivered = Some(value.clone());
                observer(value);
            }
        })
    }

    /// Derives a stream that projects each delivered value through
    /// `project` before dispatch.
    pub fn map<U, P>(&self, project: P) -> MappedStream<T, U>
    where
        P: Fn(&T) -> U + 'static,
    {
        MappedStream {
            source: self.clone(),
            project: Rc::new(project),
        }
    }
}

/// A [`FilteredStream`] projected to a derived value per delivery.
pub struct MappedStream<T, U> {
    source: FilteredStream<T>,
    project: Rc<dyn Fn(&T) -> U>,
}

impl<T: Clone + 'static, U: 'static> MappedStream<T, U> {
    /// Attaches `observer` behind the filter and projection.
    pub fn observe<F>(&self, mut observer: F) -> StreamHandle
    where
        F: FnMut(&U) + 'static,
    {
        let project = Rc::clone(&self.project);

        self.source.observe(move |value| {
            let projected = project(value);
            observer(&projected);
        })
    }
}
