//! Reconciliation use-cases over the resource store.
//!
//! # Responsibility
//! - Render derived artifacts and reconcile them against stored state.
//! - Apply inbound change events and schedule policy runs from the store's
//!   change feed.

pub mod event_step;
pub mod policy;
pub mod render;
pub mod scheduler;
pub mod sync_step;
