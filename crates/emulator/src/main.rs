//! # Telemetria Emulator
//!
//! Fonte de desenvolvimento: conecta no endpoint de ingestão do streamer e
//! envia leituras sintéticas de temperatura da bateria, uma por linha.
//!
//! ## Uso
//! ```bash
//! battery_emulator                         # config.toml ao lado do executável
//! battery_emulator --config ./config.toml
//! ```

mod signal;

use signal::BatterySignal;
use std::io::Write;
use std::net::TcpStream;
use std::time::{Duration, Instant};
use telemetry_core::config::AppConfig;
use telemetry_core::types::now_millis;
use tracing::{debug, error, info};

fn main() {
    // ── Carregar config ──
    let config_path = AppConfig::path_from_args(std::env::args().skip(1));
    let config = AppConfig::load(&config_path);

    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();

    let emu = &config.emulator;
    let interval = Duration::from_millis(emu.interval_ms.max(1));
    let reconnect = Duration::from_secs(emu.reconnect_secs);
    let mut signal = BatterySignal::new(emu.wave_period_secs, emu.glitch_every);

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ TELEMETRIA EMULATOR – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Destino:   {}", emu.target);
    println!("  Intervalo: {} ms", emu.interval_ms);
    println!("  Glitch:    a cada {} registros", emu.glitch_every);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal (reconecta ao perder a conexão) ──
    loop {
        match TcpStream::connect(&emu.target) {
            Ok(stream) => {
                info!("Conectado a {}", emu.target);
                let _ = stream.set_nodelay(true);
                if let Err(e) = stream_readings(stream, &mut signal, interval) {
                    error!("Conexão perdida: {e}");
                }
            }
            Err(e) => {
                error!("Falha ao conectar em {}: {e}", emu.target);
            }
        }
        info!("Tentando novamente em {}s...", reconnect.as_secs());
        std::thread::sleep(reconnect);
    }
}

fn stream_readings(
    mut stream: TcpStream,
    signal: &mut BatterySignal,
    interval: Duration,
) -> std::io::Result<()> {
    loop {
        let cycle_start = Instant::now();

        let mut line = signal.next_line(now_millis());
        debug!("→ {line}");
        line.push('\n');
        stream.write_all(line.as_bytes())?;

        // Dormir pelo tempo restante do intervalo
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
}
