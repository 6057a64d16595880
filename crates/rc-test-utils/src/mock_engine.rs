//! Mock media engine for room controller testing.
//!
//! Implements the engine capability traits over in-memory state. Supports:
//!
//! - Failure injection per operation (`fail_*` flags, flippable mid-test)
//! - Compatibility control for `can_consume` (per-producer deny list, plus
//!   an `"incompatible": true` marker in the capability JSON)
//! - Engine-initiated closure via `close_from_engine`, which cancels the
//!   object's close token and cascades to children
//! - A call log for asserting teardown ordering
//!
//! Consumers are created paused, like the real engine.

use async_trait::async_trait;
use room_controller::engine::{
    Consumer, DtlsParameters, EngineError, MediaEngine, MediaKind, Producer, Router,
    RouterOptions, RtpCapabilities, RtpParameters, Transport, TransportDirection,
    TransportParameters, TransportSettings,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shared log of engine calls, in invocation order.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Record one call.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// All recorded calls, in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Index of the first entry equal to `entry`, if any.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }

    /// Whether `entry` was recorded.
    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

/// Failure injection state, shared by every object the engine hands out.
#[derive(Debug, Default)]
struct Behavior {
    fail_router_creation: AtomicBool,
    fail_transport_creation: AtomicBool,
    fail_connect: AtomicBool,
    fail_produce: AtomicBool,
    fail_consume: AtomicBool,
    fail_resume: AtomicBool,
    fail_close: AtomicBool,
    incompatible_producers: Mutex<HashSet<String>>,
}

/// Builder for [`MockEngine`].
#[derive(Debug, Default)]
pub struct MockEngineBuilder {
    fail_router_creation: bool,
    fail_transport_creation: bool,
    fail_connect: bool,
    fail_produce: bool,
    fail_consume: bool,
    fail_resume: bool,
    fail_close: bool,
    incompatible_producers: HashSet<String>,
}

impl MockEngineBuilder {
    /// Start building a mock engine that succeeds at everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make router creation fail.
    pub fn fail_router_creation(mut self) -> Self {
        self.fail_router_creation = true;
        self
    }

    /// Make transport creation fail.
    pub fn fail_transport_creation(mut self) -> Self {
        self.fail_transport_creation = true;
        self
    }

    /// Make transport connect fail.
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make produce fail.
    pub fn fail_produce(mut self) -> Self {
        self.fail_produce = true;
        self
    }

    /// Make consume fail.
    pub fn fail_consume(mut self) -> Self {
        self.fail_consume = true;
        self
    }

    /// Make consumer resume fail.
    pub fn fail_resume(mut self) -> Self {
        self.fail_resume = true;
        self
    }

    /// Make every close call fail.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Mark a producer as incompatible with every capability set.
    pub fn incompatible_producer(mut self, producer_id: impl Into<String>) -> Self {
        self.incompatible_producers.insert(producer_id.into());
        self
    }

    /// Build the engine.
    pub fn build(self) -> Arc<MockEngine> {
        let behavior = Behavior {
            fail_router_creation: AtomicBool::new(self.fail_router_creation),
            fail_transport_creation: AtomicBool::new(self.fail_transport_creation),
            fail_connect: AtomicBool::new(self.fail_connect),
            fail_produce: AtomicBool::new(self.fail_produce),
            fail_consume: AtomicBool::new(self.fail_consume),
            fail_resume: AtomicBool::new(self.fail_resume),
            fail_close: AtomicBool::new(self.fail_close),
            incompatible_producers: Mutex::new(self.incompatible_producers),
        };

        Arc::new(MockEngine {
            behavior: Arc::new(behavior),
            log: CallLog::default(),
            routers: Mutex::new(Vec::new()),
        })
    }
}

/// Mock media engine.
#[derive(Debug)]
pub struct MockEngine {
    behavior: Arc<Behavior>,
    log: CallLog,
    routers: Mutex<Vec<Arc<MockRouter>>>,
}

impl MockEngine {
    /// The shared call log.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Routers created so far.
    pub fn routers(&self) -> Vec<Arc<MockRouter>> {
        self.routers.lock().unwrap().clone()
    }

    /// Flip router creation failure mid-test.
    pub fn set_fail_router_creation(&self, fail: bool) {
        self.behavior.fail_router_creation.store(fail, Ordering::SeqCst);
    }

    /// Flip transport creation failure mid-test.
    pub fn set_fail_transport_creation(&self, fail: bool) {
        self.behavior
            .fail_transport_creation
            .store(fail, Ordering::SeqCst);
    }

    /// Flip connect failure mid-test.
    pub fn set_fail_connect(&self, fail: bool) {
        self.behavior.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Flip produce failure mid-test.
    pub fn set_fail_produce(&self, fail: bool) {
        self.behavior.fail_produce.store(fail, Ordering::SeqCst);
    }

    /// Flip consume failure mid-test.
    pub fn set_fail_consume(&self, fail: bool) {
        self.behavior.fail_consume.store(fail, Ordering::SeqCst);
    }

    /// Flip resume failure mid-test.
    pub fn set_fail_resume(&self, fail: bool) {
        self.behavior.fail_resume.store(fail, Ordering::SeqCst);
    }

    /// Flip close failure mid-test.
    pub fn set_fail_close(&self, fail: bool) {
        self.behavior.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Mark a producer as incompatible with every capability set.
    pub fn mark_incompatible(&self, producer_id: impl Into<String>) {
        self.behavior
            .incompatible_producers
            .lock()
            .unwrap()
            .insert(producer_id.into());
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn create_router(&self, options: RouterOptions) -> Result<Arc<dyn Router>, EngineError> {
        self.log.record("engine.create_router");

        if self.behavior.fail_router_creation.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable(
                "router creation disabled".to_string(),
            ));
        }

        let router = Arc::new(MockRouter {
            id: format!("router-{}", Uuid::new_v4()),
            media_codecs: options.media_codecs,
            behavior: Arc::clone(&self.behavior),
            log: self.log.clone(),
            closed: CancellationToken::new(),
            transports: Mutex::new(Vec::new()),
            producer_kinds: Arc::new(Mutex::new(HashMap::new())),
        });

        self.routers.lock().unwrap().push(Arc::clone(&router));
        Ok(router)
    }
}

/// Mock router.
#[derive(Debug)]
pub struct MockRouter {
    id: String,
    media_codecs: Vec<serde_json::Value>,
    behavior: Arc<Behavior>,
    log: CallLog,
    closed: CancellationToken,
    transports: Mutex<Vec<Arc<MockTransport>>>,
    /// Producer kinds by id, shared with every transport so cross-transport
    /// consumes resolve the media kind.
    producer_kinds: Arc<Mutex<HashMap<String, MediaKind>>>,
}

impl MockRouter {
    /// Transports created on this router so far.
    pub fn transports(&self) -> Vec<Arc<MockTransport>> {
        self.transports.lock().unwrap().clone()
    }

    /// Whether the router has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Simulate the engine closing this router and everything under it.
    pub fn close_from_engine(&self) {
        self.closed.cancel();
        for transport in self.transports.lock().unwrap().iter() {
            transport.close_from_engine();
        }
    }
}

#[async_trait]
impl Router for MockRouter {
    fn id(&self) -> &str {
        &self.id
    }

    fn rtp_capabilities(&self) -> RtpCapabilities {
        RtpCapabilities(json!({
            "codecs": self.media_codecs,
            "headerExtensions": [],
        }))
    }

    fn can_consume(&self, producer_id: &str, rtp_capabilities: &RtpCapabilities) -> bool {
        if self
            .behavior
            .incompatible_producers
            .lock()
            .unwrap()
            .contains(producer_id)
        {
            return false;
        }
        if rtp_capabilities
            .0
            .get("incompatible")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            return false;
        }
        self.producer_kinds.lock().unwrap().contains_key(producer_id)
    }

    async fn create_transport(
        &self,
        direction: TransportDirection,
        settings: TransportSettings,
    ) -> Result<Arc<dyn Transport>, EngineError> {
        self.log.record(format!("router.create_transport {}", self.id));

        if self.behavior.fail_transport_creation.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected(
                "transport creation disabled".to_string(),
            ));
        }

        let transport = Arc::new(MockTransport {
            id: format!("transport-{}", Uuid::new_v4()),
            direction,
            settings,
            behavior: Arc::clone(&self.behavior),
            log: self.log.clone(),
            closed: CancellationToken::new(),
            connected: AtomicBool::new(false),
            producers: Mutex::new(Vec::new()),
            consumers: Mutex::new(Vec::new()),
            producer_kinds: Arc::clone(&self.producer_kinds),
        });

        self.transports.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.log.record(format!("router.close {}", self.id));

        if self.behavior.fail_close.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("close disabled".to_string()));
        }

        self.close_from_engine();
        Ok(())
    }
}

/// Mock transport.
#[derive(Debug)]
pub struct MockTransport {
    id: String,
    direction: TransportDirection,
    settings: TransportSettings,
    behavior: Arc<Behavior>,
    log: CallLog,
    closed: CancellationToken,
    connected: AtomicBool,
    producers: Mutex<Vec<Arc<MockProducer>>>,
    consumers: Mutex<Vec<Arc<MockConsumer>>>,
    producer_kinds: Arc<Mutex<HashMap<String, MediaKind>>>,
}

impl MockTransport {
    /// The transport direction.
    pub fn direction(&self) -> TransportDirection {
        self.direction
    }

    /// The settings the transport was created with.
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Whether `connect` has been called.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Producers created on this transport so far.
    pub fn producers(&self) -> Vec<Arc<MockProducer>> {
        self.producers.lock().unwrap().clone()
    }

    /// Consumers created on this transport so far.
    pub fn consumers(&self) -> Vec<Arc<MockConsumer>> {
        self.consumers.lock().unwrap().clone()
    }

    /// Simulate the engine closing this transport and everything on it.
    pub fn close_from_engine(&self) {
        self.closed.cancel();
        for producer in self.producers.lock().unwrap().iter() {
            producer.close_from_engine();
        }
        for consumer in self.consumers.lock().unwrap().iter() {
            consumer.close_from_engine();
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn remote_parameters(&self) -> TransportParameters {
        TransportParameters(json!({
            "id": self.id,
            "iceParameters": { "usernameFragment": "mock", "password": "mock" },
            "iceCandidates": [{ "ip": self.settings.listen_ip, "protocol": "udp" }],
            "dtlsParameters": { "role": "auto", "fingerprints": [] },
        }))
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn connect(&self, _dtls_parameters: DtlsParameters) -> Result<(), EngineError> {
        self.log.record(format!("transport.connect {}", self.id));

        if self.behavior.fail_connect.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("connect disabled".to_string()));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Arc<dyn Producer>, EngineError> {
        self.log.record(format!("transport.produce {}", self.id));

        if self.behavior.fail_produce.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("produce disabled".to_string()));
        }

        let producer = Arc::new(MockProducer {
            id: format!("producer-{}", Uuid::new_v4()),
            kind,
            rtp_parameters,
            behavior: Arc::clone(&self.behavior),
            log: self.log.clone(),
            closed: CancellationToken::new(),
        });

        self.producer_kinds
            .lock()
            .unwrap()
            .insert(producer.id.clone(), kind);
        self.producers.lock().unwrap().push(Arc::clone(&producer));
        Ok(producer)
    }

    async fn consume(
        &self,
        producer_id: &str,
        _rtp_capabilities: &RtpCapabilities,
    ) -> Result<Arc<dyn Consumer>, EngineError> {
        self.log.record(format!("transport.consume {}", self.id));

        if self.behavior.fail_consume.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("consume disabled".to_string()));
        }

        let kind = self
            .producer_kinds
            .lock()
            .unwrap()
            .get(producer_id)
            .copied()
            .ok_or_else(|| {
                EngineError::Rejected(format!("unknown producer: {producer_id}"))
            })?;

        let consumer = Arc::new(MockConsumer {
            id: format!("consumer-{}", Uuid::new_v4()),
            producer_id: producer_id.to_string(),
            kind,
            rtp_parameters: RtpParameters(json!({
                "codecs": [],
                "consumerOf": producer_id,
            })),
            behavior: Arc::clone(&self.behavior),
            log: self.log.clone(),
            closed: CancellationToken::new(),
            paused: AtomicBool::new(true),
        });

        self.consumers.lock().unwrap().push(Arc::clone(&consumer));
        Ok(consumer)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.log.record(format!("transport.close {}", self.id));

        if self.behavior.fail_close.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("close disabled".to_string()));
        }

        self.close_from_engine();
        Ok(())
    }
}

/// Mock producer.
#[derive(Debug)]
pub struct MockProducer {
    id: String,
    kind: MediaKind,
    rtp_parameters: RtpParameters,
    behavior: Arc<Behavior>,
    log: CallLog,
    closed: CancellationToken,
}

impl MockProducer {
    /// The RTP parameters the producer was created with.
    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.rtp_parameters
    }

    /// Whether the producer has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Simulate the engine closing this producer.
    pub fn close_from_engine(&self) {
        self.closed.cancel();
    }
}

#[async_trait]
impl Producer for MockProducer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.log.record(format!("producer.close {}", self.id));

        if self.behavior.fail_close.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("close disabled".to_string()));
        }

        self.closed.cancel();
        Ok(())
    }
}

/// Mock consumer. Created paused, like the real engine.
#[derive(Debug)]
pub struct MockConsumer {
    id: String,
    producer_id: String,
    kind: MediaKind,
    rtp_parameters: RtpParameters,
    behavior: Arc<Behavior>,
    log: CallLog,
    closed: CancellationToken,
    paused: AtomicBool,
}

impl MockConsumer {
    /// Whether the consumer is still paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether the consumer has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Simulate the engine closing this consumer.
    pub fn close_from_engine(&self) {
        self.closed.cancel();
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    fn id(&self) -> &str {
        &self.id
    }

    fn producer_id(&self) -> &str {
        &self.producer_id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn rtp_parameters(&self) -> RtpParameters {
        self.rtp_parameters.clone()
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    async fn resume(&self) -> Result<(), EngineError> {
        self.log.record(format!("consumer.resume {}", self.id));

        if self.behavior.fail_resume.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("resume disabled".to_string()));
        }

        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.log.record(format!("consumer.close {}", self.id));

        if self.behavior.fail_close.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("close disabled".to_string()));
        }

        self.closed.cancel();
        Ok(())
    }
}
