//! Resource store contract and persistence implementations.
//!
//! # Responsibility
//! - Define the typed store interface consumed by policy and event code.
//! - Isolate SQLite query details from reconciliation decisions.
//!
//! # Invariants
//! - Store writes enforce record `validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`, `NotPersisted`) in
//!   addition to DB transport errors.

pub mod resource_store;
pub mod sqlite_store;
