//! chartkeeper-lib: reconciliation core for chart-deployed managed apps
//!
//! This crate drives each `ManagedApp` instance toward a deployed chart release:
//! - `Reconciler`: one idempotent pass per instance (finalizer, image defaults, install/upgrade, uninstall)
//! - `DependencyGraph`: edges between instances and the namespaces they manage
//! - `InstanceMapper`: routes secondary resource changes back to their instances
//! - `Controller`: runs passes concurrently from watch events, with retry backoff
//!
//! The store, the chart renderer and the releaser are collaborator traits;
//! in-memory implementations are provided for embedding and tests.

pub mod config;
pub mod consts;
pub mod controller;
pub mod graph;
pub mod instance;
pub mod mapper;
pub mod reconcile;
pub mod reference;
pub mod release;
pub mod render;
pub mod store;
pub mod util;

pub use config::OperatorConfig;
pub use controller::{Controller, WatchEvent};
pub use graph::DependencyGraph;
pub use mapper::InstanceMapper;
pub use reconcile::{Reconcile, ReconcileError, ReconcileOutcome, Reconciler};
