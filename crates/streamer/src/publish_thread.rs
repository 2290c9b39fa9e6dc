//! Endpoint WebSocket dos assinantes.
//!
//! O servidor só envia. Cada assinante ganha uma thread de escrita que
//! consome a sua fila no hub; erro de transporte encerra apenas aquele
//! assinante.

use crate::error::StreamerError;
use crate::hub::{SubscriberFeed, subscriber_channel};
use crate::service::Command;
use crossbeam_channel::Sender;
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;
use telemetry_core::config::PublishConfig;
use tracing::{debug, error, info, warn};
use tungstenite::{Message, WebSocket};

/// Inicia a thread que aceita assinantes.
pub fn spawn_publish_acceptor(
    listener: TcpListener,
    commands: Sender<Command>,
    config: PublishConfig,
) -> Result<JoinHandle<()>, StreamerError> {
    std::thread::Builder::new()
        .name("ws-publish".into())
        .spawn(move || acceptor_loop(&listener, &commands, &config))
        .map_err(|source| StreamerError::Spawn {
            name: "ws-publish",
            source,
        })
}

fn acceptor_loop(listener: &TcpListener, commands: &Sender<Command>, config: &PublishConfig) {
    if let Ok(addr) = listener.local_addr() {
        info!("[ws] Servidor WebSocket escutando em {addr}");
    }

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let commands = commands.clone();
                let config = config.clone();
                let spawned = std::thread::Builder::new()
                    .name("ws-subscriber".into())
                    .spawn(move || subscriber_session(stream, &commands, &config));
                if let Err(e) = spawned {
                    error!("[ws] Falha ao criar thread do assinante: {e}");
                }
            }
            Err(e) => {
                warn!("[ws] Erro ao aceitar conexão: {e}");
            }
        }
    }
}

fn subscriber_session(stream: TcpStream, commands: &Sender<Command>, config: &PublishConfig) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "desconhecido".into());
    let _ = stream.set_nodelay(true);

    let timeout = Duration::from_millis(config.handshake_timeout_ms);
    let Some(mut socket) = accept_subscriber(stream, timeout, &peer) else {
        return;
    };

    let (handle, feed) = subscriber_channel(peer.clone(), config.subscriber_queue);
    if commands.send(Command::Subscribe(handle)).is_err() {
        return;
    }

    write_loop(&mut socket, &feed, &peer);

    feed.close();
    let _ = socket.close(None);
    let _ = socket.flush();
    info!("[ws] Assinante desconectado: {peer}");
}

/// Handshake WebSocket com prazo. Cliente que conecta e fica calado não
/// prende a thread; depois do handshake a leitura volta a ser sem prazo.
fn accept_subscriber(
    stream: TcpStream,
    timeout: Duration,
    peer: &str,
) -> Option<WebSocket<TcpStream>> {
    if let Err(e) = stream.set_read_timeout(Some(timeout)) {
        warn!("[ws] Não foi possível definir timeout para {peer}: {e}");
        return None;
    }

    let socket = match tungstenite::accept(stream) {
        Ok(socket) => socket,
        Err(e) => {
            warn!("[ws] Handshake falhou para {peer}: {e}");
            return None;
        }
    };

    if let Err(e) = socket.get_ref().set_read_timeout(None) {
        warn!("[ws] Não foi possível limpar timeout de {peer}: {e}");
        return None;
    }
    Some(socket)
}

fn write_loop(socket: &mut WebSocket<TcpStream>, feed: &SubscriberFeed, peer: &str) {
    for frame in feed.rx.iter() {
        if let Err(e) = socket.send(Message::text(frame.to_string())) {
            match e {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                    debug!("[ws] {peer} fechou a conexão");
                }
                e => warn!("[ws] Erro ao enviar para {peer}: {e}"),
            }
            return;
        }
    }
}
