//! Erros de inicialização do streamer.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum StreamerError {
    #[error("Configuração inválida: {}", .0.join("; "))]
    Config(Vec<String>),

    #[error("Falha ao fazer bind do endpoint de {endpoint} em {addr}: {source}")]
    Bind {
        endpoint: &'static str,
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Falha ao criar thread {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Erro de I/O: {0}")]
    Io(#[from] io::Error),
}
