//! mailwatch mirrors mail-provider outages into GitHub tracking issues.
//!
//! One invocation is one pass: poll the provider status feeds, reconcile the
//! parsed incidents against the persisted state file, create/update/close
//! tracking issues as needed, then write the state back.

pub mod config;
pub mod engine;
pub mod feeds;
pub mod models;
pub mod state;
pub mod tracker;
