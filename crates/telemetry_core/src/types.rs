//! Definição de tipos/structs para telemetria da bateria.
//!
//! [`CleanSample`] é o que sai do validador; [`OutboundEvent`] é o que vai
//! para os assinantes, com o discriminador `type` no JSON.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ──────────────────────────────────────────────
// Amostra validada
// ──────────────────────────────────────────────

/// Leitura de temperatura já saneada.
///
/// Invariante: `battery_temperature` é finita e está dentro da faixa
/// plausível configurada; `timestamp` é inteiro (ms desde a época Unix).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanSample {
    /// Temperatura da bateria (°C)
    pub battery_temperature: f64,
    /// Instante da leitura (ms)
    pub timestamp: i64,
}

// ──────────────────────────────────────────────
// Eventos publicados
// ──────────────────────────────────────────────

/// Evento enviado a todos os assinantes do feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// Registro que passou pela validação.
    Data {
        battery_temperature: f64,
        timestamp: i64,
    },
    /// Transição 0↔1 de conexões da fonte.
    Status {
        #[serde(rename = "sourceConnected")]
        source_connected: bool,
        ts: i64,
    },
    /// Pulso periódico de vivacidade.
    Heartbeat {
        #[serde(rename = "sourceConnected")]
        source_connected: bool,
        ts: i64,
    },
    /// Janela de violações atingiu o limiar.
    Alert { message: String, ts: i64 },
}

impl OutboundEvent {
    /// Nome do discriminador `type`, útil em logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data { .. } => "data",
            Self::Status { .. } => "status",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Alert { .. } => "alert",
        }
    }
}

impl From<CleanSample> for OutboundEvent {
    fn from(sample: CleanSample) -> Self {
        Self::Data {
            battery_temperature: sample.battery_temperature,
            timestamp: sample.timestamp,
        }
    }
}

/// Relógio de parede em milissegundos desde a época Unix.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
