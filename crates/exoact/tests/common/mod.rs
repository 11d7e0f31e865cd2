//! Shared helpers for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use exoact::LocalityId;
use exoact::MemoryNetwork;
use exoact::MemoryTransport;
use exoact::Registry;
use exoact::RegistryBuilder;
use exoact::Runtime;
use exoact::StaticDirectory;
use exoact::Transport;
use tracing_subscriber::EnvFilter;

/// Installs a log subscriber once per test binary; `RUST_LOG` selects levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Several localities wired through one in-memory network.
pub struct Cluster {
    pub network: MemoryNetwork,
    pub localities: Vec<Runtime>,
}

impl Cluster {
    pub fn at(&self, index: usize) -> &Runtime {
        &self.localities[index]
    }
}

pub fn registry(register: impl Fn(&mut RegistryBuilder) -> exoact::Result<()>) -> anyhow::Result<Arc<Registry>> {
    let mut builder = RegistryBuilder::new();
    register(&mut builder)?;
    Ok(Arc::new(builder.build()?))
}

/// Starts localities `0..size` sharing one registry.
pub async fn cluster(size: u32, register: impl Fn(&mut RegistryBuilder) -> exoact::Result<()>) -> anyhow::Result<Cluster> {
    cluster_with(size, register, |endpoint| endpoint).await
}

/// Like `cluster`, with every endpoint wrapped by `wrap`.
pub async fn cluster_with<T: Transport>(
    size: u32,
    register: impl Fn(&mut RegistryBuilder) -> exoact::Result<()>,
    wrap: impl Fn(MemoryTransport) -> T,
) -> anyhow::Result<Cluster> {
    init_tracing();

    let network = MemoryNetwork::new();
    let registry = registry(register)?;
    let ids: Vec<LocalityId> = (0..size).map(LocalityId).collect();
    let directory = StaticDirectory::new(ids.clone());

    let mut localities = Vec::new();
    for id in ids {
        let runtime = Runtime::builder(id)
            .registry(registry.clone())
            .directory(directory.clone())
            .transport(wrap(network.endpoint(id)))
            .start()
            .await?;
        localities.push(runtime);
    }

    Ok(Cluster { network, localities })
}

/// Polls `condition` until it holds, failing after a generous deadline.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("condition not reached before deadline");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    Ok(())
}
