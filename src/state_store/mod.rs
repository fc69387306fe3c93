//! Observable path-addressable state container.
//!
//! Holds one JSON-shaped state object, applies shallow-merge updates, and
//! notifies path-scoped and whole-state subscribers synchronously.

mod error;
mod index;
mod store;
mod subscription;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use store::{Store, StoreState};
pub use subscription::{Subscription, ValueCallback, value_callback};
