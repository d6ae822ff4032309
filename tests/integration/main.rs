//! Cross-layer integration tests for Kiln
//!
//! Tests that verify correct interaction between multiple crates.


/// Routes store logging to the test harness. Set `RUST_LOG=kiln_storage=trace`
/// to see index notifications.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
