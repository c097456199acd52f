mod addr;

pub use addr::{get_unused_addr, get_unused_host};

/// Installs a tracing subscriber for the test, ignoring any already installed one.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
