//! # Example: Service registry from a manifest
//!
//! Declares three services in TOML, builds them in dependency order and
//! prints every transition through a closure listener.
//!
//! Run with: `cargo run --example registry`

use std::collections::HashMap;
use std::time::Duration;

use servicevisor::{ServiceFn, ServiceManifest, ServiceRef, ServiceRegistryBuilder, Transition};
use tracing_subscriber::EnvFilter;

const MANIFEST: &str = r#"
[services.db]
restart_interval_ms = 2000

[services.cache]
depends_on = ["db"]

[services.api]
depends_on = ["db", "cache"]
keep_alive_interval_ms = 500
"#;

fn timed(name: &'static str, work_ms: u64) -> ServiceRef {
    ServiceFn::new()
        .on_init(move |_| async move {
            tokio::time::sleep(Duration::from_millis(work_ms)).await;
            Ok(())
        })
        .on_start(move |_| async move {
            println!("[{name}] starting");
            tokio::time::sleep(Duration::from_millis(work_ms)).await;
            Ok(())
        })
        .on_keep_alive(|_| async { Ok(()) })
        .arc()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let manifest = ServiceManifest::from_toml(MANIFEST)?;
    let bodies: HashMap<String, ServiceRef> = [
        ("db".to_string(), timed("db", 200)),
        ("cache".to_string(), timed("cache", 50)),
        ("api".to_string(), timed("api", 100)),
    ]
    .into_iter()
    .collect();

    let registry = ServiceRegistryBuilder::from_manifest(manifest, bodies)?
        .with_listener(|t: &Transition| println!("  {} : {} -> {}", t.service, t.from, t.to))
        .build()?;
    println!("dependency order: {:?}", registry.dependency_order());

    registry.wait_all_ready().await?;
    for (name, status) in registry.statuses() {
        println!("{name}: {}", status.state);
    }

    registry.stop_all();
    registry.dispose_all();
    Ok(())
}
