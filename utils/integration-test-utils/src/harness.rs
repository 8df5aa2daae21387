use std::future::Future;
use std::sync::{Arc, Once};
use std::time::Duration;
use stream_bridge::control_plane::local::LocalControlPlane;
use stream_bridge::transport::memory::{InMemoryBroker, InMemoryConnector};
use stream_bridge::{BridgeConfig, StreamBridge};
use tracing_subscriber::EnvFilter;

pub const TEST_CLUSTER_ID: &str = "test-cluster";
pub const TEST_CLIENT_ID: &str = "test-client";

static INIT_TRACING: Once = Once::new();

/// Installs a test-writer subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A bridge started on the in-memory transport and an in-process control
/// plane, with handles on both for assertions.
pub struct BridgeHarness {
    pub bridge: StreamBridge,
    pub control_plane: Arc<LocalControlPlane>,
    pub broker: Arc<InMemoryBroker>,
}

impl BridgeHarness {
    pub async fn start() -> Self {
        Self::start_with(BridgeConfig::new(TEST_CLUSTER_ID, TEST_CLIENT_ID)).await
    }

    pub async fn start_with(config: BridgeConfig) -> Self {
        Self::start_on(config, InMemoryBroker::new(), Arc::new(LocalControlPlane::new())).await
    }

    pub async fn start_on(
        config: BridgeConfig,
        broker: Arc<InMemoryBroker>,
        control_plane: Arc<LocalControlPlane>,
    ) -> Self {
        init_tracing();
        let bridge = match StreamBridge::start(
            config,
            &InMemoryConnector::new(broker.clone()),
            control_plane.clone(),
        )
        .await
        {
            Ok(bridge) => bridge,
            Err(err) => panic!("bridge failed to start: {err}"),
        };
        Self {
            bridge,
            control_plane,
            broker,
        }
    }
}

/// Polls `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
