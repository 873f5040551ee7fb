//! Per-type component storage indexed by entity id.
//!
//! # Layout
//! Each component type has its own [`Store`].
//! A store keeps its components in a packed array of slots,
//! so iterating over the slots touches contiguous memory
//! regardless of how sparse the entity ids are.
//! Freed slots are recycled before the array grows.
//!
//! Entity ids are mapped to slots by a B+ tree.
//! The leaves of the tree are chained in ascending key order,
//! so iterating over a store yields components sorted by entity id
//! without visiting any internal node after the first descent.
//!
//! # Addresses
//! A component is addressed by its [`Slot`](storage::Slot) rather than a pointer.
//! Growing the packed array moves the components in memory,
//! but a slot stays valid until the component is removed.
//! References returned by [`Store::get`] borrow the store,
//! so they cannot outlive a subsequent [`Store::upsert`].
//!
//! # Concurrency
//! A store is not synchronized internally.
//! [`Registry`] places each store behind its own lock,
//! so writers to different component types can run in parallel.
//!
//! ```
//! use std::num::NonZeroU32;
//!
//! use comptree::config::Config;
//! use comptree::Store;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position(i32, i32);
//!
//! let mut store = Store::<NonZeroU32, Position>::new(Config::default().with_order(4)).unwrap();
//! let id = |i| NonZeroU32::new(i).unwrap();
//!
//! store.upsert(id(7), Position(1, 2));
//! store.upsert(id(3), Position(5, 6));
//! assert_eq!(store.upsert(id(7), Position(3, 4)), Some(Position(1, 2)));
//!
//! let ids: Vec<_> = store.iter().map(|(id, _)| id.get()).collect();
//! assert_eq!(ids, [3, 7]);
//! ```

#![cfg_attr(doc, warn(missing_docs))]

pub mod config;
pub use config::Config;

pub mod entity;

pub mod registry;
pub use registry::Registry;

pub mod storage;
pub use storage::{Storage, Store};

#[cfg(test)]
mod test_util;
