//! pref-learner - learns summary-writing preferences from edits

use pref_learner::{cli, log_filter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level unless RUST_LOG is set, e.g. RUST_LOG=info for round details)
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    cli::run().await
}
