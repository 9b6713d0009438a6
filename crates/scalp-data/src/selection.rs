//! Selection files.

use scalp_core::traits::SelectionProvider;
use scalp_core::types::OptionSide;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One selected contract as written by the selection job.
#[derive(Debug, Deserialize)]
struct SelectionEntry {
    #[serde(alias = "tradingsymbol")]
    symbol: String,
}

/// Reads the per-side JSON selection files on every lookup, so an
/// intraday re-selection takes effect without a restart. A missing or
/// unreadable file degrades to an empty set.
pub struct FileSelection {
    calls_path: PathBuf,
    puts_path: PathBuf,
}

impl FileSelection {
    pub fn new(calls_path: impl Into<PathBuf>, puts_path: impl Into<PathBuf>) -> Self {
        Self {
            calls_path: calls_path.into(),
            puts_path: puts_path.into(),
        }
    }

    fn load(path: &Path) -> HashSet<String> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => return HashSet::new(),
        };
        match serde_json::from_str::<Vec<SelectionEntry>>(&text) {
            Ok(entries) => entries.into_iter().map(|e| e.symbol).collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable selection file, treating as empty");
                HashSet::new()
            }
        }
    }
}

impl SelectionProvider for FileSelection {
    fn selected_symbols(&self, side: OptionSide) -> HashSet<String> {
        match side {
            OptionSide::Call => Self::load(&self.calls_path),
            OptionSide::Put => Self::load(&self.puts_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_symbols_per_side() {
        let dir = tempfile::tempdir().unwrap();
        let ce = dir.path().join("selected_ce.json");
        let pe = dir.path().join("selected_pe.json");
        let mut f = std::fs::File::create(&ce).unwrap();
        write!(
            f,
            r#"[{{"symbol":"NIFTY25SEP24500CE","selected_at":"2025-09-01 09:21:00"}}]"#
        )
        .unwrap();

        let provider = FileSelection::new(&ce, &pe);
        let calls = provider.selected_symbols(OptionSide::Call);
        assert!(calls.contains("NIFTY25SEP24500CE"));
        // Missing put file degrades to empty.
        assert!(provider.selected_symbols(OptionSide::Put).is_empty());
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ce = dir.path().join("selected_ce.json");
        std::fs::write(&ce, "not json").unwrap();
        let provider = FileSelection::new(&ce, dir.path().join("missing.json"));
        assert!(provider.selected_symbols(OptionSide::Call).is_empty());
    }
}
