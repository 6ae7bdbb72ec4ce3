//! Message transport.
//!
//! [`Publisher`] is the "publish bytes to a topic and confirm delivery"
//! capability. [`KafkaPublisher`] is the production implementation;
//! [`MemoryPublisher`] keeps messages in process for dry runs and tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::debug;

use httpcheck_core::KafkaConfig;

use crate::error::{PublishError, PublishResult};

/// Boxed future returned by [`Publisher::publish`].
pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = PublishResult<Delivery>> + Send + 'a>>;

/// Where a confirmed message landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Publish one payload and resolve once the transport confirms it.
pub trait Publisher: Send + Sync {
    /// `timeout` bounds how long the transport may hold the message
    /// before giving up on delivery.
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a [u8], timeout: Duration) -> PublishFuture<'a>;
}

/// Kafka producer built from a [`KafkaConfig`].
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Create the producer. Fails if librdkafka rejects the settings.
    pub fn new(config: &KafkaConfig, drain_timeout: Duration) -> PublishResult<Self> {
        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("message.timeout.ms", drain_timeout.as_millis().to_string());
        if let Some(protocol) = &config.security_protocol {
            client.set("security.protocol", protocol);
        }
        if let Some(mechanism) = &config.sasl_mechanism {
            client.set("sasl.mechanism", mechanism);
        }
        if let (Some(username), Some(password)) = (&config.sasl_username, &config.sasl_password) {
            client
                .set("sasl.username", username)
                .set("sasl.password", password);
        }

        let producer: FutureProducer = client
            .create()
            .map_err(|e| PublishError::Init(e.to_string()))?;
        debug!(bootstrap = %config.bootstrap_servers, "kafka producer created");
        Ok(Self { producer })
    }
}

impl Publisher for KafkaPublisher {
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a [u8], timeout: Duration) -> PublishFuture<'a> {
        Box::pin(async move {
            let record = FutureRecord::<(), [u8]>::to(topic).payload(payload);
            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => Ok(Delivery { partition, offset }),
                Err((e, _message)) => Err(PublishError::Delivery(e.to_string())),
            }
        })
    }
}

/// Captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// In-process publisher. Every publish succeeds at the next offset of
/// partition 0.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Publisher for MemoryPublisher {
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a [u8], _timeout: Duration) -> PublishFuture<'a> {
        Box::pin(async move {
            let mut messages = self
                .messages
                .lock()
                .map_err(|_| PublishError::Delivery("message buffer poisoned".to_string()))?;
            messages.push(Message {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            });
            Ok(Delivery {
                partition: 0,
                offset: messages.len() as i64 - 1,
            })
        })
    }
}
