//! Hub de assinantes: registra endpoints e faz fan-out de cada evento.
//!
//! Cada assinante tem uma fila própria consumida pela sua thread de
//! escrita, o que garante ordem FIFO por assinante. O evento é serializado
//! uma única vez e o mesmo texto vai para todas as filas.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use telemetry_core::protocol::encode_event;
use telemetry_core::types::OutboundEvent;
use tracing::{debug, error, trace};

/// Texto JSON compartilhado entre as filas dos assinantes.
pub type Frame = Arc<str>;

/// Lado do hub de um assinante conectado.
#[derive(Debug)]
pub struct SubscriberHandle {
    pub peer: String,
    tx: Sender<Frame>,
    open: Arc<AtomicBool>,
}

/// Lado da thread de escrita: fila de frames e sinal de transporte aberto.
#[derive(Debug)]
pub struct SubscriberFeed {
    pub rx: Receiver<Frame>,
    open: Arc<AtomicBool>,
}

impl SubscriberFeed {
    /// Marca o transporte como fechado; o hub passa a ignorar o assinante.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Drop for SubscriberFeed {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cria o par handle/feed de um assinante com fila de `capacity` frames.
pub fn subscriber_channel(peer: impl Into<String>, capacity: usize) -> (SubscriberHandle, SubscriberFeed) {
    let (tx, rx) = bounded(capacity);
    let open = Arc::new(AtomicBool::new(true));
    (
        SubscriberHandle {
            peer: peer.into(),
            tx,
            open: Arc::clone(&open),
        },
        SubscriberFeed { rx, open },
    )
}

impl SubscriberHandle {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Conjunto de assinantes atuais.
#[derive(Debug, Default)]
pub struct SubscriberHub {
    subscribers: Vec<SubscriberHandle>,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um assinante. Nenhum evento anterior é reenviado.
    pub fn register(&mut self, handle: SubscriberHandle) {
        debug!("[ws] Assinante registrado: {}", handle.peer);
        self.subscribers.push(handle);
    }

    /// Publica um evento para todos os assinantes abertos.
    ///
    /// Retorna quantas entregas foram enfileiradas. Assinantes fechados são
    /// pulados e saem do conjunto; fila cheia descarta o evento só para
    /// aquele assinante.
    pub fn publish(&mut self, event: &OutboundEvent) -> usize {
        let frame: Frame = match encode_event(event) {
            Ok(text) => text.into(),
            Err(e) => {
                error!("Erro ao serializar evento {}: {e}", event.kind());
                return 0;
            }
        };

        let mut delivered = 0;
        self.subscribers.retain(|sub| {
            if !sub.is_open() {
                debug!("[ws] Assinante {} fechado, removendo", sub.peer);
                return false;
            }
            match sub.tx.try_send(Arc::clone(&frame)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    debug!("[ws] Fila de {} cheia, descartando {}", sub.peer, event.kind());
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        });

        trace!("→ {} para {delivered} assinante(s)", event.kind());
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
