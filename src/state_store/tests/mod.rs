//! Unit tests for the state_store module.
//! No filesystem, timing, or external dependencies.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde_json::{Value, json};

use crate::{
    state_store::{Store, StoreError, StoreState, ValueCallback, value_callback},
    stream::ValueStream,
};

use super::index::{IndexEntry, PathIndex};

fn obj(value: Value) -> StoreState {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other:?}"),
    }
}

fn counter() -> (Rc<Cell<usize>>, ValueCallback) {
    let count = Rc::new(Cell::new(0));
    let callback = value_callback({
        let count = Rc::clone(&count);
        move |_| count.set(count.get() + 1)
    });
    (count, callback)
}

#[test]
fn update_shallow_merges_top_level_keys() {
    let store = Store::new();

    store.update(obj(json!({"test": "values", "another": "testValue"})));
    store.update(obj(json!({"moreValues": true})));

    let state = store.get_state();
    assert_eq!(state.get("test"), Some(&json!("values")));
    assert_eq!(state.get("another"), Some(&json!("testValue")));
    assert_eq!(state.get("moreValues"), Some(&json!(true)));
}

#[test]
fn update_replaces_overwritten_values_wholesale() {
    let store = Store::with_state(obj(json!({"a": {"x": 1, "y": 2}, "b": 3})));

    store.update(obj(json!({"a": {"x": 9}})));

    // Merge depth is exactly one level: the nested object is replaced,
    // never merged, while untouched siblings stay.
    assert_eq!(store.get("a"), Some(json!({"x": 9})));
    assert_eq!(store.get("a.y"), None);
    assert_eq!(store.get("b"), Some(json!(3)));
}

#[test]
fn get_resolves_paths_with_fallback() {
    let store = Store::with_state(obj(json!({
        "nested": {"parent": {"obj": "val"}},
        "arrayVals": ["a", "b", "c"],
    })));

    assert_eq!(store.get("nested.parent.obj"), Some(json!("val")));
    assert_eq!(store.get("arrayVals[1]"), Some(json!("b")));
    assert_eq!(store.get("nested.wrong.parent.obj"), None);
    assert_eq!(
        store.get_or("nested.wrong.parent.obj", json!("it's okay")),
        json!("it's okay")
    );
}

#[test]
fn try_get_reports_absent_paths() {
    let store = Store::with_state(obj(json!({"present": 1})));

    assert_eq!(store.try_get("present").unwrap(), json!(1));
    assert!(matches!(
        store.try_get("absent.path"),
        Err(StoreError::PathNotFound { .. })
    ));
}

#[test]
fn get_as_deserializes_typed_values() {
    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Session {
        user: String,
        attempts: u32,
    }

    let store = Store::with_state(obj(json!({
        "session": {"user": "ada", "attempts": 3},
    })));

    let session: Session = store.get_as("session").unwrap();
    assert_eq!(
        session,
        Session {
            user: "ada".to_string(),
            attempts: 3
        }
    );

    assert!(matches!(
        store.get_as::<u64>("session.user"),
        Err(StoreError::TypeMismatch { .. })
    ));
    assert!(matches!(
        store.get_as::<Session>("session.user"),
        Err(StoreError::TypeMismatch { .. })
    ));
}

#[test]
fn subscribe_fires_on_every_update() {
    let store = Store::with_state(obj(json!({"a": 1})));
    let count = Rc::new(Cell::new(0));

    let fired = Rc::clone(&count);
    let _subscription = store.subscribe(move |_| fired.set(fired.get() + 1));
    assert_eq!(count.get(), 1);

    // No distinct filter: a merge that changes nothing still fires.
    store.update(obj(json!({"a": 1})));
    store.update(obj(json!({"a": 2})));

    assert_eq!(count.get(), 3);
}

#[test]
fn on_replays_the_current_value_once_at_registration() {
    let store = Store::with_state(obj(json!({"nested": {"val": "firstValue"}})));
    let (count, callback) = counter();

    let _subscription = store.on("nested.val", callback);

    assert_eq!(count.get(), 1);
}

#[test]
fn on_delivers_the_resolved_leaf_value() {
    let store = Store::with_state(obj(json!({"nested": {"val": "firstValue"}})));
    let last = Rc::new(RefCell::new(None::<Option<Value>>));

    let seen = Rc::clone(&last);
    let callback = value_callback(move |value: Option<&Value>| {
        *seen.borrow_mut() = Some(value.cloned());
    });
    let _subscription = store.on("nested.val", callback);

    assert_eq!(*last.borrow(), Some(Some(json!("firstValue"))));

    store.update(obj(json!({"nested": {"val": 42}})));
    assert_eq!(*last.borrow(), Some(Some(json!(42))));
}

#[test]
fn on_absent_path_delivers_none_until_a_value_appears() {
    let store = Store::new();
    let last = Rc::new(RefCell::new(None::<Option<Value>>));

    let seen = Rc::clone(&last);
    let callback = value_callback(move |value: Option<&Value>| {
        *seen.borrow_mut() = Some(value.cloned());
    });
    let _subscription = store.on("missing.leaf", callback);

    assert_eq!(*last.borrow(), Some(None));

    store.update(obj(json!({"missing": {"leaf": "now here"}})));
    assert_eq!(*last.borrow(), Some(Some(json!("now here"))));
}

#[test]
fn on_suppresses_updates_that_leave_the_value_unchanged() {
    let store = Store::with_state(obj(json!({"nested": {"val": "same"}, "other": 1})));
    let (count, callback) = counter();

    let _subscription = store.on("nested.val", callback);
    assert_eq!(count.get(), 1);

    store.update(obj(json!({"nested": {"val": "same"}})));
    store.update(obj(json!({"other": 2})));
    assert_eq!(count.get(), 1);

    store.update(obj(json!({"nested": {"val": "changed"}})));
    assert_eq!(count.get(), 2);
}

#[test]
fn on_with_empty_path_fires_on_every_update() {
    let store = Store::with_state(obj(json!({"a": 1})));
    let (count, callback) = counter();

    let _subscription = store.on("", callback);
    assert_eq!(count.get(), 1);

    store.update(obj(json!({"a": 1})));
    store.update(obj(json!({"a": 2})));

    assert_eq!(count.get(), 3);
}

#[test]
fn unsubscribe_is_idempotent_and_leaves_siblings_alone() {
    let store = Store::with_state(obj(json!({"key": 1})));
    let (first_count, first) = counter();
    let (second_count, second) = counter();

    let first_sub = store.on("key", first);
    let _second_sub = store.on("key", second);
    assert_eq!(store.subscription_count("key"), 2);

    first_sub.unsubscribe();
    first_sub.unsubscribe();
    assert_eq!(store.subscription_count("key"), 1);

    store.update(obj(json!({"key": 2})));

    assert_eq!(first_count.get(), 1);
    assert_eq!(second_count.get(), 2);
}

#[test]
fn off_removes_the_first_match_only() {
    let store = Store::with_state(obj(json!({"key": 1})));
    let (count, callback) = counter();

    let _first = store.on("key", Rc::clone(&callback));
    let _second = store.on("key", Rc::clone(&callback));
    assert_eq!(count.get(), 2);
    assert_eq!(store.subscription_count("key"), 2);

    let removed = store.off("key", &callback);
    assert_eq!(removed.len(), 1);
    assert_eq!(store.subscription_count("key"), 1);

    // The surviving duplicate still fires, exactly once per change.
    store.update(obj(json!({"key": 2})));
    assert_eq!(count.get(), 3);

    let removed = store.off("key", &callback);
    assert_eq!(removed.len(), 1);
    assert_eq!(store.subscription_count("key"), 0);

    store.update(obj(json!({"key": 3})));
    assert_eq!(count.get(), 3);
}

#[test]
fn off_miss_returns_empty_and_touches_nothing() {
    let store = Store::with_state(obj(json!({"key": 1})));
    let (count, registered) = counter();
    let (_, never_registered) = counter();

    let _subscription = store.on("key", registered);

    assert!(store.off("key", &never_registered).is_empty());
    assert!(store.off("unknown.path", &never_registered).is_empty());
    assert_eq!(store.subscription_count("key"), 1);

    store.update(obj(json!({"key": 2})));
    assert_eq!(count.get(), 2);
}

#[test]
fn unsubscribe_after_off_is_a_noop() {
    let store = Store::with_state(obj(json!({"key": 1})));
    let (count, callback) = counter();

    let subscription = store.on("key", Rc::clone(&callback));
    assert_eq!(store.off("key", &callback).len(), 1);

    subscription.unsubscribe();
    assert_eq!(store.subscription_count("key"), 0);

    store.update(obj(json!({"key": 2})));
    assert_eq!(count.get(), 1);
}

#[test]
fn stable_ids_survive_interleaved_removals() {
    let store = Store::with_state(obj(json!({"key": 1})));
    let (a_count, a) = counter();
    let (b_count, b) = counter();
    let (c_count, c) = counter();

    let a_sub = store.on("key", a);
    let b_sub = store.on("key", b);
    let c_sub = store.on("key", c);

    // Removing an earlier sibling must not shift which entry a later
    // handle removes.
    a_sub.unsubscribe();
    c_sub.unsubscribe();
    assert_eq!(store.subscription_count("key"), 1);

    store.update(obj(json!({"key": 2})));

    assert_eq!(a_count.get(), 1);
    assert_eq!(b_count.get(), 2);
    assert_eq!(c_count.get(), 1);

    b_sub.unsubscribe();
    assert_eq!(store.subscription_count("key"), 0);
}

#[test]
fn watch_delivers_the_full_state_on_path_change() {
    let store = Store::with_state(obj(json!({"key": 1, "other": "x"})));
    let last = Rc::new(RefCell::new(StoreState::new()));
    let count = Rc::new(Cell::new(0));

    let seen = Rc::clone(&last);
    let fired = Rc::clone(&count);
    let subscription = store.watch("key", move |state: &StoreState| {
        *seen.borrow_mut() = state.clone();
        fired.set(fired.get() + 1);
    });
    assert_eq!(count.get(), 1);
    assert_eq!(subscription.path(), Some("key"));

    store.update(obj(json!({"other": "y"})));
    assert_eq!(count.get(), 1);

    store.update(obj(json!({"key": 2})));
    assert_eq!(count.get(), 2);
    assert_eq!(last.borrow().get("key"), Some(&json!(2)));
    assert_eq!(last.borrow().get("other"), Some(&json!("y")));

    subscription.unsubscribe();
    store.update(obj(json!({"key": 3})));
    assert_eq!(count.get(), 2);
}

#[test]
fn watch_registrations_are_not_indexed() {
    let store = Store::with_state(obj(json!({"key": 1})));

    let _subscription = store.watch("key", |_| {});

    assert_eq!(store.subscription_count("key"), 0);
}

#[test]
fn path_index_removes_by_id_and_finds_first_callback_match() {
    let stream = ValueStream::new(0);
    let mut index = PathIndex::default();

    let (_, shared) = counter();
    let (_, other) = counter();

    let first_id = index.next_id();
    let second_id = index.next_id();
    index.append(
        "key",
        IndexEntry {
            id: first_id,
            callback: Rc::clone(&shared),
            handle: stream.observe(|_: &i32| {}),
        },
    );
    index.append(
        "key",
        IndexEntry {
            id: second_id,
            callback: Rc::clone(&shared),
            handle: stream.observe(|_: &i32| {}),
        },
    );

    assert_eq!(index.find_by_callback("key", &shared), Some(first_id));
    assert_eq!(index.find_by_callback("key", &other), None);
    assert_eq!(index.find_by_callback("unknown", &shared), None);

    assert!(index.remove("key", first_id).is_some());
    assert!(index.remove("key", first_id).is_none());
    assert!(index.remove("unknown", second_id).is_none());
    assert_eq!(index.find_by_callback("key", &shared), Some(second_id));
    assert_eq!(index.len_at("key"), 1);
}
