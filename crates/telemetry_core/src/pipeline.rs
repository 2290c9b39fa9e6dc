//! Contexto único do pipeline: validação, janela de violações, contagem de
//! fontes e diagnóstico de descartes.
//!
//! Todo o estado mutável do processo vive aqui e pertence a uma só thread
//! (o serviço do streamer). Cada operação devolve os eventos a publicar,
//! na ordem em que devem sair.

use crate::alerts::BreachDetector;
use crate::config::PipelineConfig;
use crate::sources::SourceTracker;
use crate::types::OutboundEvent;
use crate::validation::{Plausibility, RejectionLog, parse_record};
use tracing::{debug, info};

/// Estado do pipeline de ingestão.
#[derive(Debug, Clone)]
pub struct Pipeline {
    limits: Plausibility,
    detector: BreachDetector,
    rejections: RejectionLog,
    sources: SourceTracker,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            limits: Plausibility::from(config),
            detector: BreachDetector::new(config),
            rejections: RejectionLog::new(config.diagnostic_interval_ms),
            sources: SourceTracker::default(),
        }
    }

    /// Nova conexão da fonte; gera `status` na transição 0→1.
    pub fn on_source_connected(&mut self, now_ms: i64) -> Option<OutboundEvent> {
        let transition = self.sources.connect();
        info!("[tcp] Fonte conectada. Ativas: {}", self.sources.active());
        transition.then_some(OutboundEvent::Status {
            source_connected: true,
            ts: now_ms,
        })
    }

    /// Conexão da fonte encerrada; gera `status` na transição 1→0.
    pub fn on_source_disconnected(&mut self, now_ms: i64) -> Option<OutboundEvent> {
        let transition = self.sources.disconnect();
        info!("[tcp] Fonte desconectada. Ativas: {}", self.sources.active());
        transition.then_some(OutboundEvent::Status {
            source_connected: false,
            ts: now_ms,
        })
    }

    /// Processa um registro completo. O alerta (se houver) sai antes do dado.
    pub fn on_record(&mut self, line: &str, now_ms: i64) -> Vec<OutboundEvent> {
        let sample = match parse_record(line, now_ms, self.limits) {
            Ok(sample) => sample,
            Err(reason) => {
                debug!("Registro descartado ({reason}): {line}");
                self.rejections.note(reason, now_ms);
                return Vec::new();
            }
        };

        let mut events = Vec::with_capacity(2);
        if let Some(alert) = self
            .detector
            .observe(sample.battery_temperature, sample.timestamp)
        {
            events.push(OutboundEvent::Alert {
                message: alert.message,
                ts: alert.ts,
            });
        }
        events.push(sample.into());
        events
    }

    /// Pulso periódico com o estado atual da fonte.
    pub fn heartbeat(&self, now_ms: i64) -> OutboundEvent {
        OutboundEvent::Heartbeat {
            source_connected: self.sources.is_connected(),
            ts: now_ms,
        }
    }

    pub fn source_connected(&self) -> bool {
        self.sources.is_connected()
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejections.total()
    }
}
