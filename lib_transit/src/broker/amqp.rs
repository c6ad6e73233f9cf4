//! # AMQP Transport
//!
//! RabbitMQ session built on `lapin`. One connection, one channel, two
//! server-named queues whose consumers are merged into a single stream tagged
//! with the origin of each delivery.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::{
    BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info};

use super::{Broker, Session, Topology};
use crate::configs::BrokerConfig;
use crate::error::TransportError;
use crate::messages::{Envelope, Origin};

pub struct AmqpBroker {
    config: BrokerConfig,
}

impl AmqpBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

type Deliveries = Pin<Box<dyn Stream<Item = (Origin, Result<Delivery, lapin::Error>)> + Send + Sync>>;

struct AmqpSession {
    // Held so the connection lives as long as the session.
    _connection: Connection,
    channel: Channel,
    task_queue: String,
    rt_queue: String,
    deliveries: Option<Deliveries>,
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn connect(&self, topology: &Topology) -> Result<Box<dyn Session>, TransportError> {
        debug!("Connection to rabbitmq: {}", self.config.display_uri());
        let connection = Connection::connect_uri(amqp_uri(&self.config), ConnectionProperties::default())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let topo = |e: lapin::Error| TransportError::Topology(e.to_string());

        channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(topo)?;

        let task_queue = channel
            .queue_declare("", private_queue(), FieldTable::default())
            .await
            .map_err(topo)?
            .name()
            .as_str()
            .to_string();
        channel
            .queue_bind(
                &task_queue,
                &topology.exchange,
                &topology.task_binding(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(topo)?;

        let rt_queue = channel
            .queue_declare("", private_queue(), FieldTable::default())
            .await
            .map_err(topo)?
            .name()
            .as_str()
            .to_string();
        info!("Subscribing to [{}]", topology.rt_topics.join(", "));
        for topic in &topology.rt_topics {
            channel
                .queue_bind(
                    &rt_queue,
                    &topology.exchange,
                    topic,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(topo)?;
        }

        debug!("Connected to rabbitmq");
        Ok(Box::new(AmqpSession {
            _connection: connection,
            channel,
            task_queue,
            rt_queue,
            deliveries: None,
        }))
    }
}

/// Typed broker address. Credentials and vhost are kept verbatim, so no
/// character in them can change how the address is parsed.
fn amqp_uri(config: &BrokerConfig) -> AMQPUri {
    AMQPUri {
        scheme: AMQPScheme::AMQP,
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            host: config.host.clone(),
            port: config.port,
        },
        vhost: config.vhost.clone(),
        ..Default::default()
    }
}

/// Server-named queue that lives and dies with this session.
fn private_queue() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: false,
        exclusive: true,
        auto_delete: true,
        ..Default::default()
    }
}

impl AmqpSession {
    async fn consume(&self, queue: &str, tag: &str) -> Result<lapin::Consumer, TransportError> {
        self.channel
            .basic_consume(
                queue,
                tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| TransportError::Consume {
                queue: queue.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Session for AmqpSession {
    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let tasks = self.consume(&self.task_queue, "task").await?;
        let realtime = self.consume(&self.rt_queue, "realtime").await?;

        let merged = stream::select(
            tasks.map(|d| (Origin::Task, d)),
            realtime.map(|d| (Origin::Realtime, d)),
        );
        self.deliveries = Some(Box::pin(merged));
        Ok(())
    }

    async fn next_envelope(&mut self) -> Result<Envelope, TransportError> {
        let deliveries = self
            .deliveries
            .as_mut()
            .ok_or_else(|| TransportError::Other("session is not subscribed".to_string()))?;

        match deliveries.next().await {
            Some((origin, Ok(delivery))) => Ok(Envelope::new(
                origin,
                delivery.routing_key.as_str(),
                delivery.data,
            )),
            Some((_, Err(e))) => Err(e.into()),
            None => Err(TransportError::Closed),
        }
    }
}
