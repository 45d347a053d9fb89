//! `QuickTasks`: personal task tracker client library.
//!
//! Mirrors the owner's remotely-stored tasks, domains and tags into a local
//! store, derives filtered and grouped views from it, and drives single and
//! bulk mutations plus per-task time tracking against the data service.

pub mod auth;
pub mod bulk;
pub mod config;
pub mod feed;
pub mod remote;
pub mod selection;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod view;
pub mod workspace;
