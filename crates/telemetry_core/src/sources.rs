//! Contagem de conexões ativas da fonte.

/// Número de conexões TCP abertas no endpoint de ingestão.
#[derive(Debug, Clone, Default)]
pub struct SourceTracker {
    active: usize,
}

impl SourceTracker {
    /// Registra uma conexão. Retorna `true` na transição 0→1.
    pub fn connect(&mut self) -> bool {
        self.active += 1;
        self.active == 1
    }

    /// Registra um encerramento. Retorna `true` apenas na transição 1→0.
    pub fn disconnect(&mut self) -> bool {
        if self.active == 0 {
            return false;
        }
        self.active -= 1;
        self.active == 0
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_connected(&self) -> bool {
        self.active > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_only_at_zero_boundary() {
        let mut t = SourceTracker::default();
        assert!(t.connect());
        assert!(!t.connect());
        assert_eq!(t.active(), 2);
        assert!(!t.disconnect());
        assert!(t.is_connected());
        assert!(t.disconnect());
        assert!(!t.is_connected());
    }

    #[test]
    fn disconnect_floors_at_zero() {
        let mut t = SourceTracker::default();
        assert!(!t.disconnect());
        assert_eq!(t.active(), 0);
        assert!(t.connect());
    }
}
