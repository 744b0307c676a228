//! # roster-view
//!
//! Point-in-time consistent index of container metadata for a container
//! runtime daemon.
//!
//! - [`ViewStore`](store::ViewStore): latest record per container, published
//!   as immutable snapshots so listing never waits on writers.
//! - [`NameRegistry`](names::NameRegistry): one name per live container.
//! - [`ListFilter`](filter::ListFilter): validated `(key, value)` predicates.
//! - [`list`](list::list): snapshot, filter, order, and limit.
//! - [`ContainerIndex`](index::ContainerIndex): the facade lifecycle
//!   collaborators call, applying the registry/store ordering.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod filter;
pub mod index;
pub mod list;
pub mod names;
pub mod ports;
pub mod store;

pub use filter::FilterArgs;
pub use index::ContainerIndex;
pub use list::{ContainerSummary, ListOptions};
pub use names::NameRegistry;
pub use store::{Snapshot, ViewStore};
