//! # Data Transfer Test Suite
//!
//! Cross-subsystem scenarios: two or more managers talking over an
//! in-process network, each with its own store and simulated transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs        # Peers, scripted validators, wait helpers
//!     ├── negotiation.rs    # Open, accept, reject, complete
//!     ├── pause_resume.rs   # Pause holds, vouchers, data limits
//!     ├── protocol_errors.rs # Out-of-place messages and their replies
//!     ├── recovery.rs       # Manager restarts over a persisted store
//!     ├── restart.rs        # Restart / RestartExisting handshakes
//!     └── concurrency.rs    # Tie-break, cancel races, stalls
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dt-tests
//! cargo test -p dt-tests integration::recovery
//!
//! # Benchmarks
//! cargo bench -p dt-tests
//! ```

pub mod integration;
