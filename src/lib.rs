//! Scoreline Library
//!
//! An adaptive, partitioned cache and polling controller for live scoreboards,
//! plus the ESPN client and CLI configuration used by the terminal app. Exposed
//! as a library for use in integration tests.

pub mod cache;
pub mod cli;
pub mod controller;
pub mod data;
pub mod fetch;
pub mod logging;
pub mod partition;
