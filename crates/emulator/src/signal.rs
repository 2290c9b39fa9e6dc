//! Gerador de leituras sintéticas de temperatura da bateria.
//!
//! A temperatura segue uma senoide centrada na faixa segura, de modo que
//! parte das leituras cai fora dela. Os nomes de campo alternam entre os
//! aliases aceitos e, periodicamente, sai um registro defeituoso para
//! exercitar o validador do streamer.

use serde_json::{Value, json};
use std::f64::consts::TAU;

/// Centro da senoide (°C).
const CENTER: f64 = 35.5;
/// Amplitude da senoide (°C).
const AMPLITUDE: f64 = 1.5;

const TEMPERATURE_ALIASES: [&str; 4] = ["battery_temperature", "temp", "temperature", "value"];

/// Tipos de registro defeituoso, em rodízio.
const GLITCHES: usize = 4;

/// Fonte de registros JSON por linha.
#[derive(Debug)]
pub struct BatterySignal {
    period_ms: f64,
    glitch_every: u32,
    seq: u64,
}

impl BatterySignal {
    pub fn new(period_secs: f64, glitch_every: u32) -> Self {
        Self {
            period_ms: (period_secs * 1000.0).max(1.0),
            glitch_every,
            seq: 0,
        }
    }

    /// Temperatura sem ruído no instante `ts_ms`.
    pub fn temperature_at(&self, ts_ms: i64) -> f64 {
        let phase = (ts_ms as f64 % self.period_ms) / self.period_ms;
        CENTER + AMPLITUDE * (phase * TAU).sin()
    }

    /// Próxima linha (sem `\n`) para o instante `ts_ms`.
    pub fn next_line(&mut self, ts_ms: i64) -> String {
        self.seq += 1;

        if self.glitch_every > 0 && self.seq % u64::from(self.glitch_every) == 0 {
            let kind = (self.seq / u64::from(self.glitch_every)) as usize % GLITCHES;
            return glitch(kind, ts_ms);
        }

        let temp = (self.temperature_at(ts_ms) * 1000.0).round() / 1000.0;
        let key = TEMPERATURE_ALIASES[self.seq as usize % TEMPERATURE_ALIASES.len()];
        let record: Value = match self.seq % 3 {
            0 => json!({ key: temp, "timestamp": ts_ms }),
            1 => json!({ key: temp, "ts": ts_ms }),
            // Número como string, sem timestamp (o streamer usa a hora de chegada)
            _ => json!({ key: temp.to_string() }),
        };
        record.to_string()
    }
}

fn glitch(kind: usize, ts_ms: i64) -> String {
    match kind {
        0 => json!({ "battery_temperature": 999.0, "timestamp": ts_ms }).to_string(),
        1 => json!({ "battery_temperature": "abc", "timestamp": ts_ms }).to_string(),
        2 => json!({ "battery_temperature": 35.5, "timestamp": "soon" }).to_string(),
        _ => format!("{{\"battery_temperature\": 35.{ts_ms}"),
    }
}
