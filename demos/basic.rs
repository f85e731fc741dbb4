//! Walks through the store contract on every backend.
//!
//! ```text
//! RUST_LOG=ttlkv=debug cargo run --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ttlkv::config::{FileConfig, MapConfig};
use ttlkv::storage::{ConcurrentMapStore, FileStore, MapStore, Store};

async fn exercise<S: Store>(store: Arc<S>) -> anyhow::Result<()> {
    store.set("a", &1)?;
    let a: Option<i32> = store.get("a")?;
    info!(backend = S::KIND, ?a, "set then get");

    store.set_ex("b", &2, Duration::from_secs(1))?;
    let b: Option<i32> = store.get("b")?;
    info!(backend = S::KIND, ?b, "fresh ttl entry");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let b: Option<i32> = store.get("b")?;
    info!(backend = S::KIND, ?b, "after expiry");

    store.delete("missing")?;
    info!(
        backend = S::KIND,
        has_a = store.has("a"),
        has_missing = store.has("missing"),
        "existence checks"
    );

    store.close()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let interval = Duration::from_millis(500);

    exercise(MapStore::open(MapConfig::new().with_sweep_interval(interval))?).await?;
    exercise(ConcurrentMapStore::open(
        MapConfig::new().with_sweep_interval(interval),
    )?)
    .await?;

    let dir = tempfile::TempDir::new()?;
    exercise(FileStore::open(
        FileConfig::new(dir.path()).with_sweep_interval(interval),
    )?)
    .await?;

    Ok(())
}
