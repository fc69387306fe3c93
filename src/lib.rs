//! Pathstore - in-process observable state container addressed by path.
//!
//! A [`Store`] holds one JSON-shaped state object and lets independent
//! consumers observe changes to it without polling. Updates are shallow
//! merges of the top-level mapping; subscribers register against the whole
//! state or against a dotted/bracketed path (`"session.user"`,
//! `"items[0].name"`) and are notified synchronously, in registration
//! order, before `update` returns. Path subscribers only hear about
//! updates that actually change the value at their path.
//!
//! # Quick Start
//!
//! ```rust
//! use pathstore::{Store, value_callback};
//! use serde_json::{Map, json};
//!
//! let mut initial = Map::new();
//! initial.insert("session".into(), json!({ "user": "ada" }));
//! let store = Store::with_state(initial);
//!
//! // Fires once immediately with the current value, then on every change.
//! let on_user = value_callback(|value| {
//!     println!("user is now {value:?}");
//! });
//! let subscription = store.on("session.user", on_user.clone());
//!
//! let mut change = Map::new();
//! change.insert("session".into(), json!({ "user": "grace" }));
//! store.update(change);
//!
//! subscription.unsubscribe();
//! ```

/// Dotted/bracketed path resolution over JSON values.
pub mod path;

/// Observable state store with per-path subscription bookkeeping.
pub mod state_store;

/// Hold-and-replay value stream with per-subscriber operators.
pub mod stream;

pub use state_store::{Store, StoreError, StoreState, Subscription, ValueCallback, value_callback};
