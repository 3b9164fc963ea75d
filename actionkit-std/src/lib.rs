//! # actionkit-std
//!
//! Standard engines for the actionkit event routing runtime.
//!
//! This crate provides:
//! - **Subscription queries**: [`query::Query`], parsed once and matched per event
//! - **Mappings**: [`mapping::Mapping`], the directive-based transform engine
//! - **Readiness**: [`readiness::resolve_when`] and [`readiness::ready_signal`]
//! - **Deadlines**: [`deadline::with_deadline`] and [`deadline::TimeoutAction`]
//! - **Testing**: recording and failing actions, a recording script loader

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core
pub use actionkit_core;

// Modules
pub mod deadline;
pub mod mapping;
pub mod query;
pub mod readiness;
pub mod testing;
