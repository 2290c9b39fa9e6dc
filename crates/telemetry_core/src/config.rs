//! Configuração unificada via TOML.
//!
//! Um único `config.toml` cobre os dois endpoints do streamer, os
//! parâmetros do pipeline, o emulador de bateria e o logging.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Endpoint TCP onde a fonte de telemetria conecta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// IP local para bind
    pub bind_ip: String,
    /// Porta TCP de ingestão
    pub port: u16,
    /// Tamanho máximo de um registro ainda sem `\n` (bytes)
    pub max_record_bytes: usize,
    /// Buffer de leitura por conexão (bytes)
    pub read_buffer_bytes: usize,
    /// Comandos pendentes para o serviço; com a fila cheia as fontes esperam
    pub command_queue: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".into(),
            port: 12000,
            max_record_bytes: 64 * 1024,
            read_buffer_bytes: 4096,
            command_queue: 1024,
        }
    }
}

impl IngestConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }
}

/// Endpoint WebSocket dos assinantes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// IP local para bind
    pub bind_ip: String,
    /// Porta WebSocket
    pub port: u16,
    /// Mensagens pendentes por assinante antes de descartar
    pub subscriber_queue: usize,
    /// Tempo máximo para o cliente concluir o handshake WebSocket (ms)
    pub handshake_timeout_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".into(),
            port: 8080,
            subscriber_queue: 256,
            handshake_timeout_ms: 10_000,
        }
    }
}

impl PublishConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }
}

/// Faixas, janelas e intervalos do pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Limite inferior da faixa segura (°C, inclusivo)
    pub safe_min: f64,
    /// Limite superior da faixa segura (°C, inclusivo)
    pub safe_max: f64,
    /// Menor leitura fisicamente plausível (°C)
    pub plausible_min: f64,
    /// Maior leitura fisicamente plausível (°C)
    pub plausible_max: f64,
    /// Janela deslizante de violações (ms)
    pub breach_window_ms: i64,
    /// Violações na janela que disparam alerta
    pub breach_threshold: usize,
    /// Período do heartbeat (ms)
    pub heartbeat_interval_ms: u64,
    /// Intervalo mínimo entre resumos de registros inválidos (ms)
    pub diagnostic_interval_ms: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            safe_min: 35.0,
            safe_max: 36.0,
            plausible_min: -50.0,
            plausible_max: 150.0,
            breach_window_ms: 5000,
            breach_threshold: 3,
            heartbeat_interval_ms: 2500,
            diagnostic_interval_ms: 5000,
        }
    }
}

/// Configuração do emulador de bateria (fonte de desenvolvimento).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Endereço do endpoint de ingestão
    pub target: String,
    /// Intervalo entre leituras (ms)
    pub interval_ms: u64,
    /// A cada N registros, envia um registro defeituoso (0 = nunca)
    pub glitch_every: u32,
    /// Período da senoide de temperatura (s)
    pub wave_period_secs: f64,
    /// Espera antes de reconectar (s)
    pub reconnect_secs: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            target: "127.0.0.1:12000".into(),
            interval_ms: 500,
            glitch_every: 10,
            wave_period_secs: 20.0,
            reconnect_secs: 2,
        }
    }
}

/// Configuração de logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filtro padrão quando `RUST_LOG` não está definido
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub publish: PublishConfig,
    pub pipeline: PipelineConfig,
    pub emulator: EmulatorConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Caminho vindo de `--config <arquivo>` ou o padrão.
    pub fn path_from_args(args: impl IntoIterator<Item = String>) -> PathBuf {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                if let Some(path) = args.next() {
                    return PathBuf::from(path);
                }
            } else if let Some(path) = arg.strip_prefix("--config=") {
                return PathBuf::from(path);
            }
        }
        Self::default_path()
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let p = &self.pipeline;

        // Porta 0 = escolhida pelo sistema operacional
        if self.ingest.port != 0 && self.ingest.port == self.publish.port {
            errors.push(format!(
                "Ingestão e publicação não podem usar a mesma porta ({})",
                self.ingest.port
            ));
        }
        if self.ingest.max_record_bytes == 0 || self.ingest.read_buffer_bytes == 0 {
            errors.push("Buffers de ingestão devem ser maiores que 0".into());
        }
        if self.ingest.command_queue == 0 {
            errors.push("Fila de comandos deve ser maior que 0".into());
        }
        if self.publish.subscriber_queue == 0 {
            errors.push("Fila por assinante deve ser maior que 0".into());
        }
        if self.publish.handshake_timeout_ms == 0 {
            errors.push("Timeout de handshake deve ser maior que 0".into());
        }
        if p.safe_min > p.safe_max {
            errors.push(format!(
                "Faixa segura inválida: [{}, {}]",
                p.safe_min, p.safe_max
            ));
        }
        if p.plausible_min > p.plausible_max {
            errors.push(format!(
                "Faixa plausível inválida: [{}, {}]",
                p.plausible_min, p.plausible_max
            ));
        }
        if p.breach_window_ms <= 0 {
            errors.push(format!("Janela de violação inválida: {} ms", p.breach_window_ms));
        }
        if p.breach_threshold == 0 {
            errors.push("Limiar de violações deve ser ≥ 1".into());
        }
        if p.heartbeat_interval_ms == 0 {
            errors.push("Intervalo de heartbeat deve ser maior que 0".into());
        }
        if p.diagnostic_interval_ms < 0 {
            errors.push(format!(
                "Intervalo de diagnóstico inválido: {} ms",
                p.diagnostic_interval_ms
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_match_behavioral_constants() {
        let p = PipelineConfig::default();
        assert_eq!((p.safe_min, p.safe_max), (35.0, 36.0));
        assert_eq!((p.plausible_min, p.plausible_max), (-50.0, 150.0));
        assert_eq!(p.breach_window_ms, 5000);
        assert_eq!(p.breach_threshold, 3);
        assert_eq!(p.heartbeat_interval_ms, 2500);
        assert_eq!(p.diagnostic_interval_ms, 5000);
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.ingest.port, parsed.ingest.port);
        assert_eq!(config.pipeline, parsed.pipeline);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[ingest]
port = 9999
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.ingest.port, 9999);
        // Outros campos devem ter valor padrão
        assert_eq!(config.ingest.max_record_bytes, 65536);
        assert_eq!(config.publish.port, 8080);
    }

    #[test]
    fn inverted_band_is_reported() {
        let mut config = AppConfig::default();
        config.pipeline.safe_min = 40.0;
        config.pipeline.breach_threshold = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn shared_port_is_reported() {
        let mut config = AppConfig::default();
        config.publish.port = config.ingest.port;
        assert_eq!(config.validate().len(), 1);

        config.ingest.port = 0;
        config.publish.port = 0;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn zero_sized_queues_and_handshake_timeout_are_reported() {
        let mut config = AppConfig::default();
        assert_eq!(config.ingest.command_queue, 1024);
        assert_eq!(config.publish.handshake_timeout_ms, 10_000);

        config.ingest.command_queue = 0;
        config.publish.subscriber_queue = 0;
        config.publish.handshake_timeout_ms = 0;
        assert_eq!(config.validate().len(), 3);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.publish.port = 9090;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.publish.port, 9090);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ingest\nport = ").unwrap();
        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.ingest.port, 12000);
    }

    #[test]
    fn config_flag_overrides_path() {
        let args = ["bin", "--config", "/tmp/x.toml"].map(String::from);
        assert_eq!(AppConfig::path_from_args(args), PathBuf::from("/tmp/x.toml"));

        let args = ["bin", "--config=/etc/t.toml"].map(String::from);
        assert_eq!(AppConfig::path_from_args(args), PathBuf::from("/etc/t.toml"));
    }
}
