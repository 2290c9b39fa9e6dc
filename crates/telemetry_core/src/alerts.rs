//! Detecção de violações persistentes da faixa segura.
//!
//! Cada leitura fora de `[safe_min, safe_max]` entra numa janela deslizante
//! de timestamps. Ao atingir o limiar dentro da janela, um alerta é
//! disparado e a janela é zerada.
//!
//! ```text
//! Idle(0) ─violação─► Watching(1) ─violação─► Watching(2) ─violação─► Alerta ─► Idle(0)
//! ```

use crate::config::PipelineConfig;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::VecDeque;
use tracing::{debug, error};

/// Alerta disparado pela janela de violações.
#[derive(Debug, Clone, PartialEq)]
pub struct BreachAlert {
    pub temperature: f64,
    pub ts: i64,
    pub message: String,
}

/// Avaliador com estado da janela de violações.
#[derive(Debug, Clone)]
pub struct BreachDetector {
    safe_min: f64,
    safe_max: f64,
    window_ms: i64,
    threshold: usize,
    window: VecDeque<i64>,
}

impl BreachDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            safe_min: config.safe_min,
            safe_max: config.safe_max,
            window_ms: config.breach_window_ms,
            threshold: config.breach_threshold,
            window: VecDeque::new(),
        }
    }

    /// `true` quando a temperatura está fora da faixa segura (inclusiva).
    pub fn is_breach(&self, temperature: f64) -> bool {
        temperature < self.safe_min || temperature > self.safe_max
    }

    /// Avalia uma amostra. Leituras seguras não mexem na janela.
    pub fn observe(&mut self, temperature: f64, ts: i64) -> Option<BreachAlert> {
        if !self.is_breach(temperature) {
            return None;
        }

        self.window.push_back(ts);
        let cutoff = ts.saturating_sub(self.window_ms);
        while self.window.front().is_some_and(|&t| t < cutoff) {
            self.window.pop_front();
        }
        debug!(
            "Violação {temperature:.3}°C @ {ts} ({}/{})",
            self.window.len(),
            self.threshold
        );

        if self.window.len() < self.threshold {
            return None;
        }

        self.window.clear();
        let message = format!(
            "Battery temperature exceeded safe range ≥{} times in {}s (latest={:.3}°C @ {})",
            self.threshold,
            self.window_ms as f64 / 1000.0,
            temperature,
            format_ts(ts)
        );
        error!("[ALERT] {message}");

        Some(BreachAlert {
            temperature,
            ts,
            message,
        })
    }

    /// Violações atualmente na janela.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

fn format_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> BreachDetector {
        BreachDetector::new(&PipelineConfig::default())
    }

    #[test]
    fn band_edges_are_safe() {
        let d = detector();
        assert!(!d.is_breach(35.0));
        assert!(!d.is_breach(36.0));
        assert!(!d.is_breach(35.5));
        assert!(d.is_breach(34.999));
        assert!(d.is_breach(36.001));
    }

    #[test]
    fn three_breaches_within_window_alert_once() {
        let mut d = detector();
        assert!(d.observe(37.0, 0).is_none());
        assert!(d.observe(37.0, 1000).is_none());
        let alert = d.observe(37.5, 2000).unwrap();
        assert_eq!(alert.ts, 2000);
        assert_eq!(alert.temperature, 37.5);
        assert_eq!(d.window_len(), 0);
    }

    #[test]
    fn old_breach_is_evicted() {
        let mut d = detector();
        assert!(d.observe(37.0, 0).is_none());
        assert!(d.observe(37.0, 1000).is_none());
        assert!(d.observe(37.0, 6000).is_none());
        assert_eq!(d.window_len(), 2);
    }

    #[test]
    fn entry_exactly_at_cutoff_is_kept() {
        let mut d = detector();
        d.observe(30.0, 0);
        d.observe(30.0, 2000);
        assert!(d.observe(30.0, 5000).is_some());
    }

    #[test]
    fn safe_readings_do_not_clear_window() {
        let mut d = detector();
        d.observe(37.0, 0);
        d.observe(37.0, 100);
        assert!(d.observe(35.5, 200).is_none());
        assert_eq!(d.window_len(), 2);
        assert!(d.observe(34.0, 300).is_some());
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let mut d = detector();
        assert!(d.observe(40.0, i64::MIN).is_none());
        assert_eq!(d.window_len(), 1);

        let mut d = detector();
        assert!(d.observe(40.0, i64::MAX).is_none());
        assert!(d.observe(40.0, 1000).is_none());
        assert_eq!(d.window_len(), 2);
        let alert = d.observe(40.0, 2000).unwrap();
        assert_eq!(alert.ts, 2000);
    }

    #[test]
    fn message_falls_back_to_raw_ms_out_of_calendar_range() {
        let mut d = detector();
        d.observe(40.0, i64::MIN);
        d.observe(40.0, i64::MIN);
        let alert = d.observe(40.0, i64::MIN).unwrap();
        assert!(alert.message.ends_with(&format!("@ {})", i64::MIN)), "{}", alert.message);
    }

    #[test]
    fn next_alert_needs_three_new_breaches() {
        let mut d = detector();
        for ts in [0, 10, 20] {
            d.observe(40.0, ts);
        }
        assert!(d.observe(40.0, 30).is_none());
        assert!(d.observe(40.0, 40).is_none());
        assert!(d.observe(40.0, 50).is_some());
    }

    #[test]
    fn message_carries_temperature_and_iso_time() {
        let mut d = detector();
        d.observe(37.0, 1_699_999_999_000);
        d.observe(37.0, 1_699_999_999_500);
        let alert = d.observe(37.5, 1_700_000_000_000).unwrap();
        assert_eq!(
            alert.message,
            "Battery temperature exceeded safe range ≥3 times in 5s (latest=37.500°C @ 2023-11-14T22:13:20.000Z)"
        );
    }
}
