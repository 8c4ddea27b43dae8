//! # LAN-PAM Test Suite
//!
//! End-to-end tests that run a real listener on `127.0.0.1:0` and talk to
//! it over TCP, either through the requester client or with hand-built
//! frames.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Running daemon fixture, shared key pair, helpers
//! └── integration/
//!     ├── scenarios.rs  # Verdict, disconnect, empty and bad-key connections
//!     └── concurrency.rs# Independent concurrent requests, timeouts, history
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lanpam-tests
//! cargo test -p lanpam-tests integration::scenarios::
//! ```

pub mod integration;
pub mod support;
