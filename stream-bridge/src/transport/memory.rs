//! In-process reference streaming transport.
//!
//! Models the delivery semantics the bridge relies on: per-subject sequence
//! numbers starting at 1, in-order at-least-once delivery per subscription,
//! manual acknowledgment with ack-wait redelivery, and durable positions that
//! survive closing a handle but not unsubscribing it.
//!
//! Recognized subscription passthrough options: `deliverAllAvailable`,
//! `startAtSequence` and `ackWait` (milliseconds).

use crate::config::ConnectionConfig;
use crate::registry::SubscriptionOptions;
use crate::transport::{
    MessageAcker, MessageListener, PublishAck, StreamMessage, StreamingConnection,
    StreamingConnector, SubscriptionHandle, TransportError,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Mutex};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);

const COMPONENT: &str = "memory_transport";

/// Failures injected into the broker by tests.
#[derive(Clone, Debug, Default)]
pub struct FaultPlan {
    pub refuse_connect: bool,
    pub publish_error: Option<String>,
    pub subscribe_error: Option<String>,
    /// Delay applied before publish and subscribe complete.
    pub latency: Option<Duration>,
}

#[derive(Clone)]
struct StoredMessage {
    sequence: u64,
    data: Arc<Vec<u8>>,
    timestamp: SystemTime,
}

struct SubjectLog {
    messages: Vec<StoredMessage>,
    last_sequence: watch::Sender<u64>,
}

impl SubjectLog {
    fn new() -> Self {
        let (last_sequence, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            last_sequence,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DurableKey {
    client_id: String,
    subject: String,
    durable_name: String,
}

#[derive(Default)]
struct DeliveryCursor {
    last_delivered: u64,
    /// Outstanding sequences and their redelivery deadline.
    unacked: BTreeMap<u64, Instant>,
}

/// Shared message store standing in for a streaming cluster.
#[derive(Default)]
pub struct InMemoryBroker {
    subjects: Mutex<HashMap<String, SubjectLog>>,
    durables: Mutex<HashMap<DurableKey, Arc<Mutex<DeliveryCursor>>>>,
    faults: Mutex<FaultPlan>,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_faults(&self, plan: FaultPlan) {
        *self.faults.lock().await = plan;
    }

    async fn faults(&self) -> FaultPlan {
        self.faults.lock().await.clone()
    }

    /// Number of messages stored for `subject`.
    pub async fn published(&self, subject: &str) -> usize {
        self.subjects
            .lock()
            .await
            .get(subject)
            .map_or(0, |log| log.messages.len())
    }

    pub async fn has_durable(&self, client_id: &str, subject: &str, durable_name: &str) -> bool {
        self.durables.lock().await.contains_key(&DurableKey {
            client_id: client_id.to_string(),
            subject: subject.to_string(),
            durable_name: durable_name.to_string(),
        })
    }

    async fn append(&self, subject: &str, payload: Vec<u8>) -> u64 {
        let mut subjects = self.subjects.lock().await;
        let log = subjects
            .entry(subject.to_string())
            .or_insert_with(SubjectLog::new);
        let sequence = log.messages.len() as u64 + 1;
        log.messages.push(StoredMessage {
            sequence,
            data: Arc::new(payload),
            timestamp: SystemTime::now(),
        });
        log.last_sequence.send_replace(sequence);
        sequence
    }

    async fn message(&self, subject: &str, sequence: u64) -> Option<StoredMessage> {
        let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.subjects
            .lock()
            .await
            .get(subject)
            .and_then(|log| log.messages.get(index).cloned())
    }

    async fn watch(&self, subject: &str) -> (u64, watch::Receiver<u64>) {
        let mut subjects = self.subjects.lock().await;
        let log = subjects
            .entry(subject.to_string())
            .or_insert_with(SubjectLog::new);
        (log.messages.len() as u64, log.last_sequence.subscribe())
    }
}

pub struct InMemoryConnector {
    broker: Arc<InMemoryBroker>,
}

impl InMemoryConnector {
    pub fn new(broker: Arc<InMemoryBroker>) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> Arc<InMemoryBroker> {
        self.broker.clone()
    }
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new(InMemoryBroker::new())
    }
}

#[async_trait]
impl StreamingConnector for InMemoryConnector {
    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn StreamingConnection>, TransportError> {
        if self.broker.faults().await.refuse_connect {
            return Err(TransportError::Rejected(format!(
                "cluster {} refused client {}",
                config.cluster_id, config.client_id
            )));
        }
        debug!(
            component = COMPONENT,
            cluster_id = %config.cluster_id,
            client_id = %config.client_id,
            "client connected"
        );
        Ok(Arc::new(InMemoryConnection {
            broker: self.broker.clone(),
            client_id: config.client_id.clone(),
            closed: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }))
    }
}

pub struct InMemoryConnection {
    broker: Arc<InMemoryBroker>,
    client_id: String,
    closed: AtomicBool,
    handles: Mutex<Vec<Weak<InMemoryHandle>>>,
}

impl InMemoryConnection {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        Ok(())
    }

    async fn delivery_cursor(
        &self,
        subject: &str,
        options: &SubscriptionOptions,
        last_sequence: u64,
    ) -> (Arc<Mutex<DeliveryCursor>>, Option<DurableKey>) {
        let start_after = if options.passthrough_bool("deliverAllAvailable") == Some(true) {
            0
        } else if let Some(start) = options.passthrough_u64("startAtSequence") {
            start.saturating_sub(1)
        } else {
            last_sequence
        };
        let fresh = || {
            Arc::new(Mutex::new(DeliveryCursor {
                last_delivered: start_after,
                unacked: BTreeMap::new(),
            }))
        };

        match options.durable_name.as_deref() {
            Some(durable_name) => {
                let key = DurableKey {
                    client_id: self.client_id.clone(),
                    subject: subject.to_string(),
                    durable_name: durable_name.to_string(),
                };
                let cursor = self
                    .broker
                    .durables
                    .lock()
                    .await
                    .entry(key.clone())
                    .or_insert_with(fresh)
                    .clone();
                (cursor, Some(key))
            }
            None => (fresh(), None),
        }
    }
}

#[async_trait]
impl StreamingConnection for InMemoryConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<PublishAck, TransportError> {
        self.ensure_open()?;
        let faults = self.broker.faults().await;
        if let Some(latency) = faults.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = faults.publish_error {
            return Err(TransportError::Rejected(reason));
        }

        let sequence = self.broker.append(subject, payload).await;
        trace!(component = COMPONENT, subject, sequence, "message stored");
        Ok(PublishAck {
            guid: Uuid::new_v4().to_string(),
        })
    }

    async fn subscribe(
        &self,
        subject: &str,
        options: &SubscriptionOptions,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Arc<dyn SubscriptionHandle>, TransportError> {
        self.ensure_open()?;
        let faults = self.broker.faults().await;
        if let Some(latency) = faults.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = faults.subscribe_error {
            return Err(TransportError::Rejected(reason));
        }

        let (last_sequence, sequence_watch) = self.broker.watch(subject).await;
        let (cursor, durable_key) = self.delivery_cursor(subject, options, last_sequence).await;
        let ack_wait = options
            .passthrough_u64("ackWait")
            .map_or(DEFAULT_ACK_WAIT, Duration::from_millis);

        let task = DeliveryTask {
            broker: self.broker.clone(),
            subject: subject.to_string(),
            manual_acks: options.manual_acks,
            ack_wait,
            cursor,
            listener,
        };
        let abort = tokio::spawn(task.run(sequence_watch)).abort_handle();

        let handle = Arc::new(InMemoryHandle {
            broker: self.broker.clone(),
            subject: subject.to_string(),
            durable_key,
            closed: AtomicBool::new(false),
            abort,
        });
        self.handles.lock().await.push(Arc::downgrade(&handle));
        debug!(
            component = COMPONENT,
            subject,
            durable = options.durable_name.as_deref().unwrap_or(""),
            "subscription opened"
        );
        Ok(handle)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let handles: Vec<Weak<InMemoryHandle>> = self.handles.lock().await.drain(..).collect();
        for handle in handles.iter().filter_map(Weak::upgrade) {
            handle.stop();
        }
        debug!(component = COMPONENT, client_id = %self.client_id, "client closed");
        Ok(())
    }
}

pub struct InMemoryHandle {
    broker: Arc<InMemoryBroker>,
    subject: String,
    durable_key: Option<DurableKey>,
    closed: AtomicBool,
    abort: AbortHandle,
}

impl InMemoryHandle {
    fn stop(&self) -> bool {
        let was_open = !self.closed.swap(true, Ordering::SeqCst);
        self.abort.abort();
        was_open
    }
}

#[async_trait]
impl SubscriptionHandle for InMemoryHandle {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        self.stop();
        if let Some(key) = &self.durable_key {
            self.broker.durables.lock().await.remove(key);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.stop();
        Ok(())
    }
}

struct CursorAcker {
    cursor: Arc<Mutex<DeliveryCursor>>,
}

#[async_trait]
impl MessageAcker for CursorAcker {
    async fn ack(&self, sequence: u64) -> Result<(), TransportError> {
        self.cursor.lock().await.unacked.remove(&sequence);
        Ok(())
    }
}

struct DeliveryTask {
    broker: Arc<InMemoryBroker>,
    subject: String,
    manual_acks: bool,
    ack_wait: Duration,
    cursor: Arc<Mutex<DeliveryCursor>>,
    listener: Arc<dyn MessageListener>,
}

impl DeliveryTask {
    async fn run(self, mut sequence_watch: watch::Receiver<u64>) {
        loop {
            sequence_watch.borrow_and_update();
            self.deliver_pending().await;
            self.redeliver_expired().await;

            let next_deadline = self.cursor.lock().await.unacked.values().min().copied();
            match next_deadline {
                Some(deadline) => {
                    tokio::select! {
                        changed = sequence_watch.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => {
                    if sequence_watch.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    async fn deliver_pending(&self) {
        loop {
            let next = self.cursor.lock().await.last_delivered + 1;
            let Some(message) = self.broker.message(&self.subject, next).await else {
                break;
            };
            self.deliver(message, false).await;
        }
    }

    async fn redeliver_expired(&self) {
        let now = Instant::now();
        let expired: Vec<u64> = self
            .cursor
            .lock()
            .await
            .unacked
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(sequence, _)| *sequence)
            .collect();

        for sequence in expired {
            if !self.cursor.lock().await.unacked.contains_key(&sequence) {
                continue;
            }
            match self.broker.message(&self.subject, sequence).await {
                Some(message) => self.deliver(message, true).await,
                None => {
                    self.cursor.lock().await.unacked.remove(&sequence);
                }
            }
        }
    }

    async fn deliver(&self, message: StoredMessage, redelivered: bool) {
        {
            let mut cursor = self.cursor.lock().await;
            cursor.last_delivered = cursor.last_delivered.max(message.sequence);
            if self.manual_acks {
                cursor
                    .unacked
                    .insert(message.sequence, Instant::now() + self.ack_wait);
            }
        }
        trace!(
            component = COMPONENT,
            subject = %self.subject,
            sequence = message.sequence,
            redelivered,
            "delivering message"
        );
        let acker: Arc<dyn MessageAcker> = Arc::new(CursorAcker {
            cursor: self.cursor.clone(),
        });
        self.listener
            .on_message(StreamMessage::new(
                &self.subject,
                message.sequence,
                message.data,
                redelivered,
                message.timestamp,
                acker,
            ))
            .await;
    }
}
