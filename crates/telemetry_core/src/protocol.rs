//! Protocolo do feed de eventos.
//!
//! Cada mensagem publicada é um objeto JSON com o discriminador `type`:
//!
//! ```text
//! {"type":"data","battery_temperature":37.5,"timestamp":1700000000000}
//! {"type":"status","sourceConnected":true,"ts":1700000000000}
//! {"type":"heartbeat","sourceConnected":false,"ts":1700000000000}
//! {"type":"alert","message":"...","ts":1700000000000}
//! ```
//!
//! O evento é serializado uma única vez por publicação; o mesmo texto é
//! entregue a todos os assinantes.

use crate::types::OutboundEvent;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Codifica um [`OutboundEvent`] no texto JSON enviado aos assinantes.
pub fn encode_event(event: &OutboundEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Decodifica uma mensagem do feed (lado do assinante e testes).
pub fn decode_event(text: &str) -> Result<OutboundEvent, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
