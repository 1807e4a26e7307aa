//! Remote document store client for the Rollcall attendance agent.
//!
//! The remote is a networked key-document store: collections of JSON
//! documents supporting point reads, merge-writes, existence-checked
//! updates, and a subscribable equality-filtered query. This crate
//! specifies that boundary as the [`RemoteStore`] trait and ships two
//! implementations:
//!
//! - [`MemoryStore`] - in-process collections with push-notifying
//!   watchers, used by tests and hardware-less development.
//! - [`HttpStore`] - a reqwest client against the hosted document API,
//!   with a polling watcher that feeds the same subscription channel
//!   shape.
//!
//! # Merge Semantics
//!
//! `set_merge` and `update` touch only the top-level fields present in
//! the payload. A field set to JSON `null` is explicitly cleared; a
//! field absent from the payload is left untouched. Concurrent writers
//! of disjoint fields therefore never clobber each other; concurrent
//! writes of the same field are last-write-wins.
//!
//! # Subscriptions
//!
//! `subscribe` delivers an initial batch of documents matching the
//! filter, then a batch per observed change, until the receiver is
//! dropped. Delivery is at-least-once: consumers must tolerate seeing a
//! document again after acting on it.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use client::AnyStore;
pub use error::{StoreError, StoreResult};
pub use http::{HttpStore, HttpStoreConfig, StoreCredentials};
pub use memory::MemoryStore;
pub use traits::{ChangeBatch, Document, QueryFilter, RemoteStore};
