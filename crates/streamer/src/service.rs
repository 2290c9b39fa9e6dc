//! Thread de serviço: dona do [`Pipeline`] e do [`SubscriberHub`].
//!
//! Conexões da fonte, assinantes e o timer de heartbeat chegam aqui como
//! mensagens; cada uma é tratada até o fim antes da próxima, então o estado
//! do pipeline não precisa de locks.

use crate::hub::{SubscriberHandle, SubscriberHub};
use crossbeam_channel::{Receiver, select, tick};
use std::time::Duration;
use telemetry_core::pipeline::Pipeline;
use telemetry_core::types::{OutboundEvent, now_millis};
use tracing::{debug, info};

/// Mensagem enviada ao serviço pelas threads de rede.
#[derive(Debug)]
pub enum Command {
    /// Nova conexão TCP da fonte.
    SourceConnected { peer: String },
    /// Registro completo (aparado, não vazio) de uma conexão da fonte.
    Record(String),
    /// Conexão da fonte encerrada (EOF, erro ou limite de buffer).
    SourceDisconnected { peer: String },
    /// Assinante WebSocket pronto para receber eventos.
    Subscribe(SubscriberHandle),
}

/// Estado do serviço.
pub struct Service {
    pipeline: Pipeline,
    hub: SubscriberHub,
}

impl Service {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            hub: SubscriberHub::new(),
        }
    }

    /// Trata um comando e publica os eventos resultantes.
    pub fn handle(&mut self, command: Command, now_ms: i64) {
        match command {
            Command::SourceConnected { peer } => {
                debug!("[tcp] {peer} conectou");
                if let Some(event) = self.pipeline.on_source_connected(now_ms) {
                    self.publish(&event);
                }
            }
            Command::Record(line) => {
                for event in self.pipeline.on_record(&line, now_ms) {
                    self.publish(&event);
                }
            }
            Command::SourceDisconnected { peer } => {
                debug!("[tcp] {peer} desconectou");
                if let Some(event) = self.pipeline.on_source_disconnected(now_ms) {
                    self.publish(&event);
                }
            }
            Command::Subscribe(handle) => {
                info!("[ws] Assinante conectado: {}", handle.peer);
                self.hub.register(handle);
            }
        }
    }

    /// Publica o heartbeat periódico.
    pub fn heartbeat(&mut self, now_ms: i64) {
        let event = self.pipeline.heartbeat(now_ms);
        self.publish(&event);
    }

    fn publish(&mut self, event: &OutboundEvent) {
        self.hub.publish(event);
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn subscribers(&self) -> usize {
        self.hub.len()
    }

    /// Loop principal. Termina quando todos os remetentes de comandos somem.
    pub fn run(mut self, commands: Receiver<Command>, heartbeat_interval: Duration) {
        let ticker = tick(heartbeat_interval);
        info!(
            "Serviço iniciado – heartbeat a cada {} ms",
            heartbeat_interval.as_millis()
        );

        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => self.handle(command, now_millis()),
                    Err(_) => break,
                },
                recv(ticker) -> _ => self.heartbeat(now_millis()),
            }
        }

        info!("Serviço encerrado");
    }
}
