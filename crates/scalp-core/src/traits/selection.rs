//! Instrument selection provider trait.

use crate::types::OptionSide;
use std::collections::HashSet;

/// The currently tradable symbol universe per side, consulted by the
/// signal router's selection gate.
///
/// Implementations must degrade to an empty set (never panic) when the
/// backing store is unreadable; the router then drops the signal.
pub trait SelectionProvider: Send + Sync {
    fn selected_symbols(&self, side: OptionSide) -> HashSet<String>;
}

/// Fixed selection, mainly for tests and paper sessions.
#[derive(Debug, Default)]
pub struct StaticSelection {
    calls: HashSet<String>,
    puts: HashSet<String>,
}

impl StaticSelection {
    pub fn new(
        calls: impl IntoIterator<Item = String>,
        puts: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            calls: calls.into_iter().collect(),
            puts: puts.into_iter().collect(),
        }
    }
}

impl SelectionProvider for StaticSelection {
    fn selected_symbols(&self, side: OptionSide) -> HashSet<String> {
        match side {
            OptionSide::Call => self.calls.clone(),
            OptionSide::Put => self.puts.clone(),
        }
    }
}
