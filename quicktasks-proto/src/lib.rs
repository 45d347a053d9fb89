//! Shared record definitions for `QuickTasks`.
//!
//! The remote data service stores loosely-typed documents. This crate
//! defines the typed schemas the client mirrors them into, the validating
//! decoders that sit at that boundary, and the patch format used to
//! mutate documents without touching unrelated fields.

pub mod domain;
pub mod record;
pub mod tag;
pub mod task;
pub mod time;
