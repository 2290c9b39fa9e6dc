//! Remontagem de registros delimitados por `\n` a partir de um fluxo TCP.
//!
//! ```text
//! chunk 1: {"temp":35.1}\n{"te
//! chunk 2: mp":35.2}\n\n
//!          └──► ["{\"temp\":35.1}", "{\"temp\":35.2}"]
//! ```
//!
//! Um registro partido entre duas leituras é remontado igual ao que chega
//! inteiro. Linhas vazias (após `trim`) são ignoradas.

/// Erros de enquadramento.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("Registro sem delimitador excedeu {limit} bytes ({pending} pendentes)")]
    RecordTooLong { pending: usize, limit: usize },
}

/// Buffer pendente de uma conexão da fonte.
#[derive(Debug)]
pub struct LineFramer {
    pending: Vec<u8>,
    max_pending: usize,
}

impl LineFramer {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending,
        }
    }

    /// Acrescenta bytes e devolve os registros completos, já aparados.
    ///
    /// O último segmento (possivelmente vazio) fica pendente. Se ele
    /// ultrapassar o limite, retorna erro e a conexão deve ser encerrada.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FramingError> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]);
            let line = line.trim();
            if !line.is_empty() {
                records.push(line.to_owned());
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > self.max_pending {
            let pending = self.pending.len();
            self.pending.clear();
            return Err(FramingError::RecordTooLong {
                pending,
                limit: self.max_pending,
            });
        }

        Ok(records)
    }

    /// Bytes aguardando o próximo `\n`.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
