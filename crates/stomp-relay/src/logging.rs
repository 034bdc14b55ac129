//! Tracing initialization: structured logs to stderr, filtered by `directive`.

use tracing_subscriber::EnvFilter;

pub fn init(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
