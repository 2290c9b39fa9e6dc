//! Parser/validador de registros vindos da fonte.
//!
//! Cada linha é um objeto JSON com nomes de campo variáveis. Os campos são
//! procurados numa ordem fixa de prioridade e o primeiro presente (e não
//! `null`) vence. Strings numéricas como `"37.5"` são aceitas.

use crate::config::PipelineConfig;
use crate::types::CleanSample;
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use tracing::warn;

/// Campos aceitos para a temperatura, em ordem de prioridade.
pub const TEMPERATURE_KEYS: [&str; 4] = ["battery_temperature", "temp", "temperature", "value"];

/// Campos aceitos para o timestamp, em ordem de prioridade.
pub const TIMESTAMP_KEYS: [&str; 2] = ["timestamp", "ts"];

/// Motivo de descarte de um registro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("JSON parse error")]
    Decode,

    #[error("battery_temperature not finite")]
    TemperatureNotFinite,

    #[error("timestamp not finite")]
    TimestampNotFinite,

    #[error("battery_temperature implausible")]
    Implausible,
}

/// Limites usados na validação.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plausibility {
    pub min: f64,
    pub max: f64,
}

impl Default for Plausibility {
    fn default() -> Self {
        Self {
            min: -50.0,
            max: 150.0,
        }
    }
}

impl From<&PipelineConfig> for Plausibility {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            min: config.plausible_min,
            max: config.plausible_max,
        }
    }
}

/// Decodifica uma linha (já aparada) em [`CleanSample`].
///
/// `now_ms` é usado como timestamp quando o registro não traz nenhum.
pub fn parse_record(
    line: &str,
    now_ms: i64,
    limits: Plausibility,
) -> Result<CleanSample, RejectReason> {
    // Valores ficam crus para que literais como `1e400` cheguem à coerção
    let record: Record = serde_json::from_str(line).map_err(|_| RejectReason::Decode)?;

    let temperature = first_present(&record, &TEMPERATURE_KEYS)
        .and_then(coerce_raw)
        .filter(|t| t.is_finite())
        .ok_or(RejectReason::TemperatureNotFinite)?;

    let timestamp = match first_present(&record, &TIMESTAMP_KEYS) {
        Some(raw) => coerce_raw(raw)
            .filter(|t| t.is_finite())
            .ok_or(RejectReason::TimestampNotFinite)?,
        None => now_ms as f64,
    };

    if temperature < limits.min || temperature > limits.max {
        return Err(RejectReason::Implausible);
    }

    Ok(CleanSample {
        battery_temperature: temperature,
        timestamp: timestamp.trunc() as i64,
    })
}

type Record = BTreeMap<String, Box<RawValue>>;

fn first_present<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a RawValue> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .map(|v| &**v)
        .find(|v| v.get() != "null")
}

/// Número literal é lido direto do texto (fora do alcance de `f64` vira
/// infinito); os demais tipos passam por [`coerce_number`].
fn coerce_raw(raw: &RawValue) -> Option<f64> {
    let text = raw.get();
    if text.starts_with(|c: char| c == '-' || c.is_ascii_digit()) {
        return text.parse::<f64>().ok();
    }
    serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(coerce_number)
}

/// Conversão numérica frouxa: bool vira 0/1, string vazia vira 0, strings
/// aceitam os prefixos `0x`/`0o`/`0b` e arrays de um elemento valem o elemento.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_numeric_str(s),
        Value::Array(items) => coerce_array(items),
        Value::Null | Value::Object(_) => None,
    }
}

/// Array é convertido via texto: `[]` e `[null]` são `""`, `[x]` é `x`,
/// mais de um elemento vira `"a,b"` (não numérico).
fn coerce_array(items: &[Value]) -> Option<f64> {
    match items {
        [] => Some(0.0),
        [Value::Null] => Some(0.0),
        [Value::Bool(_)] | [Value::Object(_)] => None,
        [item] => coerce_number(item),
        _ => None,
    }
}

fn parse_numeric_str(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0.0);
    }

    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => 10,
    };
    if radix != 10 {
        let digits = &s[2..];
        if digits.is_empty() {
            return None;
        }
        return digits.chars().try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        });
    }

    // `inf`/`nan` passariam em `f64::from_str`
    if s.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) {
        return None;
    }
    s.parse::<f64>().ok()
}

// ──────────────────────────────────────────────
// Diagnóstico com limite de taxa
// ──────────────────────────────────────────────

/// Resumo emitido quando o log de descartes é liberado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectionSummary {
    /// Descartes acumulados desde o último resumo (inclui o atual)
    pub dropped: u64,
    /// Motivo do descarte que liberou o resumo
    pub reason: RejectReason,
}

/// Contador de registros descartados com log limitado por intervalo.
#[derive(Debug, Clone)]
pub struct RejectionLog {
    interval_ms: i64,
    pending: u64,
    last_emit_ms: i64,
    total: u64,
}

impl RejectionLog {
    pub fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            pending: 0,
            last_emit_ms: 0,
            total: 0,
        }
    }

    /// Registra um descarte. Retorna o resumo quando o intervalo venceu.
    pub fn note(&mut self, reason: RejectReason, now_ms: i64) -> Option<RejectionSummary> {
        self.pending += 1;
        self.total += 1;

        if now_ms - self.last_emit_ms <= self.interval_ms {
            return None;
        }

        let summary = RejectionSummary {
            dropped: self.pending,
            reason,
        };
        warn!(
            "[filter] Descartados {} pacote(s) inválido(s) nos últimos {:.0}s. Exemplo: {}",
            summary.dropped,
            self.interval_ms as f64 / 1000.0,
            reason
        );
        self.pending = 0;
        self.last_emit_ms = now_ms;
        Some(summary)
    }

    /// Descartes ainda não reportados.
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Total de descartes desde o início.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Default for RejectionLog {
    fn default() -> Self {
        Self::new(5000)
    }
}
