//! # Telemetry Core
//!
//! Crate compartilhada com os tipos, o protocolo JSON do feed de eventos,
//! a validação de registros, a detecção de violações e a configuração TOML
//! do streamer de telemetria da bateria.
//!
//! ## Módulos
//! - [`types`] – Amostra validada e eventos publicados
//! - [`protocol`] – Encode/decode JSON do feed
//! - [`framing`] – Remontagem de linhas a partir de bytes TCP
//! - [`validation`] – Parser/validador e log de descartes com limite de taxa
//! - [`alerts`] – Janela deslizante de violações da faixa segura
//! - [`sources`] – Contagem de conexões da fonte
//! - [`pipeline`] – Contexto que une tudo acima
//! - [`config`] – Configuração unificada via TOML

pub mod alerts;
pub mod config;
pub mod framing;
pub mod pipeline;
pub mod protocol;
pub mod sources;
pub mod types;
pub mod validation;

// Re-exports convenientes
pub use config::{AppConfig, EmulatorConfig, IngestConfig, PipelineConfig, PublishConfig};
pub use pipeline::Pipeline;
pub use protocol::{decode_event, encode_event};
pub use types::{CleanSample, OutboundEvent, now_millis};
