/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod logging_handler;

use anyhow::Context;
use clap::Parser;
use logging_handler::LoggingHandler;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stream_bridge::control_plane::local::LocalControlPlane;
use stream_bridge::control_plane::{ControlPlane, ControlRequest};
use stream_bridge::transport::memory::InMemoryConnector;
use stream_bridge::{BridgeConfig, StreamBridge};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "configurable-bridge")]
#[command(about = "Runs a stream bridge from a JSON5 configuration file")]
struct BridgeArgs {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
    /// Publish a heartbeat to every configured subject at this interval.
    #[arg(long, value_name = "MS")]
    heartbeat_ms: Option<u64>,
}

fn load_config(path: &PathBuf) -> anyhow::Result<BridgeConfig> {
    let document = fs::read_to_string(path)
        .with_context(|| format!("Unable to read config file {}", path.display()))?;
    BridgeConfig::from_json5(&document)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

async fn heartbeat(control_plane: Arc<LocalControlPlane>, config: BridgeConfig, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    let mut beat: u64 = 0;
    loop {
        ticker.tick().await;
        beat += 1;
        for subscription in &config.subscriptions {
            let request = ControlRequest::command(&config.base_topic, "publish")
                .with_field("subject", subscription.subject.as_str())
                .with_field("data", json!({ "heartbeat": beat }));
            if let Err(err) = control_plane.act(request).await {
                warn!(subject = %subscription.subject, err = %err, "heartbeat publish failed");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = BridgeArgs::parse();
    let config = load_config(&args.config)?;

    let control_plane = Arc::new(LocalControlPlane::new());
    for subscription in &config.subscriptions {
        let topic = format!("{}.{}", config.base_topic, subscription.subject);
        control_plane
            .add(&topic, Arc::new(LoggingHandler))
            .await
            .with_context(|| format!("Unable to serve {topic}"))?;
    }

    let bridge = StreamBridge::start(
        config.clone(),
        &InMemoryConnector::default(),
        control_plane.clone(),
    )
    .await
    .context("Unable to start bridge")?;
    info!(
        base_topic = %bridge.base_topic(),
        client_topic = %bridge.client_topic(),
        "bridge ready, press Ctrl-C to stop"
    );

    let heartbeat_task = args.heartbeat_ms.map(|ms| {
        tokio::spawn(heartbeat(
            control_plane.clone(),
            config.clone(),
            Duration::from_millis(ms.max(1)),
        ))
    });

    tokio::signal::ctrl_c()
        .await
        .context("Unable to listen for Ctrl-C")?;

    if let Some(task) = heartbeat_task {
        task.abort();
    }
    bridge.shutdown().await.context("Unable to shut down bridge")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::load_config;
    use std::path::PathBuf;

    #[test]
    fn default_config_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("DEFAULT_CONFIG.json5");
        let config = load_config(&path).expect("default config is valid");

        assert_eq!(config.client_id, "configurable-bridge");
        assert_eq!(config.subscriptions.len(), 2);
        assert_eq!(
            config.subscriptions[1].options.durable_name.as_deref(),
            Some("audit")
        );
        assert!(config.subscriptions[1].request_pattern.is_some());
    }

    #[test]
    fn missing_config_is_reported() {
        let err = load_config(&PathBuf::from("does-not-exist.json5")).expect_err("missing file");
        assert!(format!("{err:#}").contains("Unable to read config file"));
    }
}
