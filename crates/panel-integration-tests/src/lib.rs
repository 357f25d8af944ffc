//! Integration test crate for the Panel token ledger.
//!
//! This crate has no library code. It only contains integration tests that
//! drive whole unlock and purchase flows across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p panel-integration-tests
//! ```
