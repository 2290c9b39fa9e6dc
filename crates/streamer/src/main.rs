//! # Telemetria Streamer
//!
//! Serviço que conecta a fonte de telemetria da bateria aos assinantes
//! em tempo real.
//!
//! ## Uso
//! ```bash
//! telemetry_streamer                          # config.toml ao lado do executável
//! telemetry_streamer --config /etc/telemetria.toml
//! ```

use telemetry_core::config::AppConfig;
use telemetry_streamer::Streamer;
use tracing::{error, info, warn};

fn main() {
    // ── Config ──
    let config_path = AppConfig::path_from_args(std::env::args().skip(1));
    let config_exists = config_path.exists();

    // ── Logging ──
    let config = AppConfig::load(&config_path);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();
    info!("Arquivo de configuração: {}", config_path.display());

    if !config_exists {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let streamer = match Streamer::bind(config) {
        Ok(streamer) => streamer,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    // ── Banner ──
    let ingest = streamer
        .ingest_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    let publish = streamer
        .publish_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ TELEMETRIA STREAMER – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Fonte (TCP):        {ingest}");
    println!("  Assinantes (WS):    ws://{publish}");
    println!("══════════════════════════════════════════════");
    println!();

    info!("Streamer iniciado");
    if let Err(e) = streamer.run() {
        error!("{e}");
        std::process::exit(1);
    }
}
