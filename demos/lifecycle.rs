//! # Example: Single service lifecycle
//!
//! A flaky "db" service that drops its connection once while serving.
//! The supervisor stops it, waits out the cooldown and brings it back.
//!
//! Run with: `cargo run --example lifecycle --features logging`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use servicevisor::{LogWriter, ServiceFn, ServiceState, Supervisor};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let starts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&starts);

    let db = ServiceFn::new()
        .on_init(|ctx| async move {
            println!("[{}] loading credentials", ctx.name());
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .on_start(move |ctx| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                println!("[{}] connecting (attempt {attempt})", ctx.name());
                tokio::time::sleep(Duration::from_millis(100)).await;
                if attempt == 1 {
                    // The connection drops shortly after coming up.
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        ctx.report_failure(anyhow::anyhow!("connection reset by peer"));
                    });
                }
                Ok(())
            }
        })
        .on_stop(|ctx| async move {
            println!("[{}] closing pool", ctx.name());
            Ok(())
        })
        .arc();

    let sup = Supervisor::builder("db", db)
        .restart_interval(Duration::from_secs(1))
        .with_listener(LogWriter::new())
        .build()?;

    sup.wait_for(ServiceState::Ready).await;
    sup.wait_for(ServiceState::Failed).await;
    println!("status: {:?}", sup.status().failure.map(|f| f.to_string()));

    sup.wait_for(ServiceState::Ready).await;
    println!("recovered after {} start attempts", starts.load(Ordering::SeqCst));

    sup.dispose();
    sup.wait_for(ServiceState::Disposed).await;
    Ok(())
}
