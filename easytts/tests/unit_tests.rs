//! Unit tests entrypoint

#[path = "unit/proptest_tests.rs"]
mod proptest_tests;

#[path = "unit/config_file_test.rs"]
mod config_file_test;

// Tests are defined inside the modules; this harness ensures they are built
// and executed when running `cargo test`.
