//! Endpoint TCP da fonte: aceita conexões e remonta registros por linha.
//!
//! Uma thread por conexão lê os bytes, passa pelo [`LineFramer`] e envia
//! cada registro completo ao serviço, na ordem de chegada.

use crate::error::StreamerError;
use crate::service::Command;
use crossbeam_channel::Sender;
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread::JoinHandle;
use telemetry_core::config::IngestConfig;
use telemetry_core::framing::LineFramer;
use tracing::{error, info, warn};

/// Inicia a thread que aceita conexões da fonte.
pub fn spawn_ingest_acceptor(
    listener: TcpListener,
    commands: Sender<Command>,
    config: IngestConfig,
) -> Result<JoinHandle<()>, StreamerError> {
    std::thread::Builder::new()
        .name("tcp-ingest".into())
        .spawn(move || acceptor_loop(&listener, &commands, &config))
        .map_err(|source| StreamerError::Spawn {
            name: "tcp-ingest",
            source,
        })
}

fn acceptor_loop(listener: &TcpListener, commands: &Sender<Command>, config: &IngestConfig) {
    if let Ok(addr) = listener.local_addr() {
        info!("[tcp] Servidor TCP escutando em {addr}");
    }

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let commands = commands.clone();
                let config = config.clone();
                let spawned = std::thread::Builder::new()
                    .name("tcp-source".into())
                    .spawn(move || connection_loop(stream, &commands, &config));
                if let Err(e) = spawned {
                    error!("[tcp] Falha ao criar thread da conexão: {e}");
                }
            }
            Err(e) => {
                warn!("[tcp] Erro ao aceitar conexão: {e}");
            }
        }
    }
}

fn connection_loop(stream: TcpStream, commands: &Sender<Command>, config: &IngestConfig) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "desconhecido".into());

    serve_source(&stream, peer, commands, config);
    let _ = stream.shutdown(Shutdown::Both);
}

/// Lê a fonte até EOF, erro de transporte ou registro grande demais.
/// Sempre fecha com `SourceDisconnected` quando abriu com `SourceConnected`.
fn serve_source(
    mut reader: impl Read,
    peer: String,
    commands: &Sender<Command>,
    config: &IngestConfig,
) {
    if commands
        .send(Command::SourceConnected { peer: peer.clone() })
        .is_err()
    {
        return;
    }

    let mut framer = LineFramer::new(config.max_record_bytes);
    let mut buf = vec![0u8; config.read_buffer_bytes];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => match framer.push(&buf[..n]) {
                Ok(records) => {
                    for record in records {
                        if commands.send(Command::Record(record)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("[tcp] {peer}: {e}. Encerrando conexão");
                    break;
                }
            },
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                error!("[tcp] Erro na conexão {peer}: {e}");
                break;
            }
        }
    }

    let _ = commands.send(Command::SourceDisconnected { peer });
}
