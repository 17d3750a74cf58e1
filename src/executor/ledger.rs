//! Shared output ledger
//!
//! Append-only store of every line captured from completed runs. Each run
//! appends its own contiguous block.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LedgerState {
    lines: Vec<String>,
    blocks: usize,
}

/// Output collected from all completed runs
#[derive(Debug, Default)]
pub struct OutputLedger {
    state: Mutex<LedgerState>,
}

impl OutputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the lines of one completed run
    pub fn append(&self, lines: impl IntoIterator<Item = String>) {
        let mut state = self.lock();
        state.lines.extend(lines);
        state.blocks += 1;
    }

    /// Copy of all lines appended so far
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().lines.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    /// Number of runs that appended output
    pub fn blocks(&self) -> usize {
        self.lock().blocks
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_append_and_snapshot() {
        let ledger = OutputLedger::new();
        assert_eq!(ledger.len(), 0);

        ledger.append(vec!["a".to_string(), "b".to_string()]);
        ledger.append(Vec::new());

        assert_eq!(ledger.snapshot(), ["a", "b"]);
        assert_eq!(ledger.blocks(), 2);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_blocks_stay_contiguous() {
        let ledger = Arc::new(OutputLedger::new());

        let handles: Vec<_> = (0..8)
            .map(|run| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    ledger.append((0..50).map(|line| format!("{run}:{line}")));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = ledger.snapshot();
        assert_eq!(lines.len(), 400);
        for block in lines.chunks(50) {
            let run = block[0].split(':').next().unwrap();
            for (index, line) in block.iter().enumerate() {
                assert_eq!(line, &format!("{run}:{index}"));
            }
        }
    }
}
