//! Integration tests against a live listener.

pub mod concurrency;
pub mod scenarios;
