//! # Telemetria Streamer
//!
//! Recebe leituras de temperatura da bateria via TCP (JSON por linha),
//! valida, detecta violações persistentes da faixa segura e republica um
//! feed normalizado para qualquer número de assinantes WebSocket.
//!
//! ```text
//! fonte ──TCP──► tcp-source ──┐
//! fonte ──TCP──► tcp-source ──┼──► serviço (Pipeline + Hub) ──► fila ──► ws-subscriber ──WS──► assinante
//!         tick de heartbeat ──┘                               └──► fila ──► ws-subscriber ──WS──► assinante
//! ```

pub mod error;
pub mod hub;
pub mod ingest_thread;
pub mod publish_thread;
pub mod service;

use crossbeam_channel::{Receiver, bounded};
use std::net::{SocketAddr, TcpListener};
use std::thread::JoinHandle;
use std::time::Duration;
use telemetry_core::config::AppConfig;
use telemetry_core::pipeline::Pipeline;
use tracing::info;

pub use error::StreamerError;
use service::{Command, Service};

/// Os dois endpoints já vinculados, prontos para rodar.
#[derive(Debug)]
pub struct Streamer {
    config: AppConfig,
    ingest: TcpListener,
    publish: TcpListener,
}

impl Streamer {
    /// Valida a configuração e faz bind dos endpoints de ingestão e publicação.
    ///
    /// Esta é a única falha irrecuperável do streamer.
    pub fn bind(config: AppConfig) -> Result<Self, StreamerError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(StreamerError::Config(errors));
        }

        let ingest_addr = config.ingest.bind_addr();
        let ingest = TcpListener::bind(&ingest_addr).map_err(|source| StreamerError::Bind {
            endpoint: "ingestão",
            addr: ingest_addr,
            source,
        })?;

        let publish_addr = config.publish.bind_addr();
        let publish = TcpListener::bind(&publish_addr).map_err(|source| StreamerError::Bind {
            endpoint: "publicação",
            addr: publish_addr,
            source,
        })?;

        Ok(Self {
            config,
            ingest,
            publish,
        })
    }

    pub fn ingest_addr(&self) -> Result<SocketAddr, StreamerError> {
        Ok(self.ingest.local_addr()?)
    }

    pub fn publish_addr(&self) -> Result<SocketAddr, StreamerError> {
        Ok(self.publish.local_addr()?)
    }

    /// Inicia os acceptors e roda o serviço na thread atual. Só retorna se
    /// os dois acceptors terminarem.
    pub fn run(self) -> Result<(), StreamerError> {
        self.start()?.run();
        Ok(())
    }

    /// Como [`Streamer::run`], mas com o serviço numa thread própria.
    pub fn spawn(self) -> Result<JoinHandle<()>, StreamerError> {
        let running = self.start()?;
        std::thread::Builder::new()
            .name("telemetry-service".into())
            .spawn(move || running.run())
            .map_err(|source| StreamerError::Spawn {
                name: "telemetry-service",
                source,
            })
    }

    fn start(self) -> Result<Running, StreamerError> {
        let (tx, rx) = bounded(self.config.ingest.command_queue);

        ingest_thread::spawn_ingest_acceptor(self.ingest, tx.clone(), self.config.ingest.clone())?;
        publish_thread::spawn_publish_acceptor(self.publish, tx, self.config.publish.clone())?;

        let pipeline = &self.config.pipeline;
        info!(
            "Faixa segura [{}, {}] °C – alerta com {} violações em {} ms",
            pipeline.safe_min, pipeline.safe_max, pipeline.breach_threshold, pipeline.breach_window_ms
        );

        Ok(Running {
            service: Service::new(Pipeline::new(pipeline)),
            commands: rx,
            heartbeat: Duration::from_millis(pipeline.heartbeat_interval_ms),
        })
    }
}

/// Serviço com os acceptors já em execução.
struct Running {
    service: Service,
    commands: Receiver<Command>,
    heartbeat: Duration,
}

impl Running {
    fn run(self) {
        self.service.run(self.commands, self.heartbeat);
    }
}
