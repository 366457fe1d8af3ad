//! # Converge
//!
//! Declarative reconciliation of remote resources.
//!
//! A caller states the desired properties of one remote object and whether it
//! should exist. The engine lists what exists, resolves the target, and issues
//! the minimal create, update, replace or delete to converge, optionally
//! waiting for the asynchronous operation to finish.
//!
//! ## Core Concepts
//!
//! - **ResourceAdapter**: per-type list/create/update/delete plus the predicates
//!   deciding between update and replace
//! - **Matcher**: resolves an identifier (id or display name) against a listed
//!   collection, failing on ambiguity
//! - **OperationTracker**: polls a request or resource state with backoff under a
//!   deadline
//! - **Reconciler**: plans and executes one reconciliation call
//!
//! ## Example
//!
//! ```ignore
//! use converge::{
//!     DesiredState, Intent, MockAdapter, ReconcileOptions, ReconcileRequest, Reconciler,
//! };
//!
//! let adapter = MockAdapter::new("datacenter").with_immutable(&["location"]);
//! let engine = Reconciler::new(&adapter, ReconcileOptions::default());
//!
//! let request = ReconcileRequest::new(
//!     Intent::Present,
//!     DesiredState::new().with("name", "web").with("location", "de/fra"),
//! );
//! let result = engine.reconcile(&request)?;
//! assert!(result.changed);
//! ```
//!
//! Replacement of an object whose immutable properties changed only happens
//! when [`ReconcileOptions::allow_replace`] is set; otherwise the call fails
//! before anything is mutated.

pub mod adapter;
pub mod engine;
pub mod error;
pub mod filter;
pub mod identity;
pub mod matcher;
pub mod tracker;
pub mod types;

// Re-export main types at crate root
pub use adapter::{Condition, MockAdapter, MockWait, Mutation, OperationHandle, ResourceAdapter};
pub use engine::{Plan, ReconcileOptions, Reconciler};
pub use error::{AdapterError, Error, ErrorCategory, ReconcileError, Result};
pub use filter::{Filter, FilterError, apply_filters};
pub use identity::{FieldPath, ResourceIdentity};
pub use tracker::{
    Backoff, LogCallback, NoCallback, OperationTracker, PollConfig, Probe, WaitCallback, WaitError,
};
pub use types::{Action, DesiredState, Intent, ReconcileRequest, ReconcileResult, ResourceSummary};
