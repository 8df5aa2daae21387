//! Timeout-bounded adapter over a [`StreamingConnection`].

use crate::config::ConnectionConfig;
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::observability::{events, fields};
use crate::registry::SubscriptionOptions;
use crate::transport::{
    MessageListener, PublishAck, StreamMessage, StreamingConnection, StreamingConnector,
    SubscriptionHandle, TransportError,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const COMPONENT: &str = "transport_adapter";

/// Translates a transport failure of `operation` into the bridge taxonomy.
fn map_transport_error(kind: ErrorKind, operation: &str, err: TransportError) -> BridgeError {
    match err {
        TransportError::Timeout(detail) => BridgeError::fail_with_kind(
            ErrorKind::Timeout,
            format!("{operation} timed out on transport: {detail}"),
        ),
        other => BridgeError::fail_with_kind(kind, format!("{operation} failed: {other}")),
    }
}

/// Durable names may not be empty nor contain whitespace or subject tokens.
pub fn validate_durable_name(durable_name: &str) -> BridgeResult<()> {
    if durable_name.is_empty()
        || durable_name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '*' | '>'))
    {
        return Err(BridgeError::validation(format!(
            "invalid durableName {durable_name:?}: must be non-empty without whitespace, '.', '*' or '>'"
        )));
    }
    Ok(())
}

async fn bounded<T, F>(timeout: Duration, kind: ErrorKind, operation: &str, fut: F) -> BridgeResult<T>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|err| map_transport_error(kind, operation, err)),
        Err(_) => {
            warn!(
                event = events::TRANSPORT_TIMEOUT,
                component = COMPONENT,
                operation,
                timeout_ms = fields::format_duration_ms(timeout),
                "transport operation timed out"
            );
            Err(BridgeError::fail_with_kind(
                ErrorKind::Timeout,
                format!(
                    "{operation} did not complete within {}ms",
                    fields::format_duration_ms(timeout)
                ),
            ))
        }
    }
}

/// Listener bound to a subscription that is only opened to be discarded.
struct DiscardListener;

#[async_trait]
impl MessageListener for DiscardListener {
    async fn on_message(&self, _message: StreamMessage) {}
}

/// Owns the single shared streaming connection of a bridge.
pub struct TransportAdapter {
    connection: Arc<dyn StreamingConnection>,
    timeout: Duration,
}

impl TransportAdapter {
    pub async fn connect(
        connector: &dyn StreamingConnector,
        config: &ConnectionConfig,
        timeout: Duration,
    ) -> BridgeResult<Self> {
        debug!(
            component = COMPONENT,
            cluster_id = %config.cluster_id,
            client_id = %config.client_id,
            "connecting to streaming transport"
        );
        let connection = bounded(
            timeout,
            ErrorKind::Connection,
            "connect",
            connector.connect(config),
        )
        .await?;
        Ok(Self::new(connection, timeout))
    }

    pub fn new(connection: Arc<dyn StreamingConnection>, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
        }
    }

    pub async fn publish(&self, subject: &str, payload: Vec<u8>) -> BridgeResult<PublishAck> {
        bounded(
            self.timeout,
            ErrorKind::Publish,
            "publish",
            self.connection.publish(subject, payload),
        )
        .await
    }

    /// Opens a transport subscription. An invalid durable name is rejected
    /// before the transport is contacted.
    pub async fn subscribe(
        &self,
        subject: &str,
        options: &SubscriptionOptions,
        listener: Arc<dyn MessageListener>,
    ) -> BridgeResult<Arc<dyn SubscriptionHandle>> {
        if let Some(durable_name) = options.durable_name.as_deref() {
            validate_durable_name(durable_name)?;
        }
        bounded(
            self.timeout,
            ErrorKind::Subscribe,
            "subscribe",
            self.connection.subscribe(subject, options, listener),
        )
        .await
    }

    /// Permanently removes a subscription. Closed handles succeed trivially.
    pub async fn unsubscribe(&self, handle: &Arc<dyn SubscriptionHandle>) -> BridgeResult<()> {
        if handle.is_closed() {
            debug!(
                component = COMPONENT,
                subject = handle.subject(),
                "handle already closed, unsubscribe is a no-op"
            );
            return Ok(());
        }
        bounded(
            self.timeout,
            ErrorKind::Unsubscribe,
            "unsubscribe",
            handle.unsubscribe(),
        )
        .await
    }

    /// Stops delivery while the transport keeps the durable position.
    pub async fn close_handle(&self, handle: &Arc<dyn SubscriptionHandle>) -> BridgeResult<()> {
        if handle.is_closed() {
            return Ok(());
        }
        bounded(
            self.timeout,
            ErrorKind::Unsubscribe,
            "close_handle",
            handle.close(),
        )
        .await
    }

    /// Discards the durable state of a subscription that has no live handle.
    ///
    /// Streaming transports only drop durable state through an unsubscribe on
    /// an open handle, so the durable is reopened and unsubscribed at once.
    pub async fn remove_durable(
        &self,
        subject: &str,
        options: &SubscriptionOptions,
    ) -> BridgeResult<()> {
        if options.durable_name.is_none() {
            return Ok(());
        }
        let handle = self
            .subscribe(subject, options, Arc::new(DiscardListener))
            .await
            .map_err(|err| {
                BridgeError::fail_with_kind(
                    ErrorKind::Unsubscribe,
                    format!("unable to reopen durable for removal: {}", err.message()),
                )
            })?;
        self.unsubscribe(&handle).await
    }

    pub async fn close(&self) -> BridgeResult<()> {
        bounded(
            self.timeout,
            ErrorKind::Connection,
            "close",
            self.connection.close(),
        )
        .await
    }
}
