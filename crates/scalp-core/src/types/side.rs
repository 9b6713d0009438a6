//! Option side (call/put) and the configured trading side mode.

use serde::{Deserialize, Serialize};

/// Call or put, derived from the trading symbol suffix (CE/PE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Derive the side from an exchange trading symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        if symbol.ends_with("CE") {
            Some(OptionSide::Call)
        } else if symbol.ends_with("PE") {
            Some(OptionSide::Put)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSide::Call => "CE",
            OptionSide::Put => "PE",
        }
    }
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sides the engine is allowed to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SideMode {
    CallsOnly,
    PutsOnly,
    #[default]
    Both,
}

impl SideMode {
    pub fn allows(&self, side: OptionSide) -> bool {
        match self {
            SideMode::Both => true,
            SideMode::CallsOnly => side == OptionSide::Call,
            SideMode::PutsOnly => side == OptionSide::Put,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_from_symbol_suffix() {
        assert_eq!(
            OptionSide::from_symbol("NIFTY24D1924000CE"),
            Some(OptionSide::Call)
        );
        assert_eq!(
            OptionSide::from_symbol("NIFTY24D1924000PE"),
            Some(OptionSide::Put)
        );
        assert_eq!(OptionSide::from_symbol("NIFTY-FUT"), None);
    }

    #[test]
    fn side_mode_gating() {
        assert!(SideMode::Both.allows(OptionSide::Call));
        assert!(SideMode::Both.allows(OptionSide::Put));
        assert!(SideMode::CallsOnly.allows(OptionSide::Call));
        assert!(!SideMode::CallsOnly.allows(OptionSide::Put));
        assert!(!SideMode::PutsOnly.allows(OptionSide::Call));
    }
}
