//! Fixed slot registry.

use crate::slot::{SlotParams, TradeSlot};
use scalp_core::error::EngineResult;
use scalp_core::traits::Broker;
use scalp_core::types::{OptionSide, PriceCache, SideMode};
use std::path::Path;
use std::sync::Arc;

/// All execution slots, created once at startup.
///
/// Slots are named `CE_1..CE_n` and `PE_1..PE_n`; each persists to its
/// own JSON file under the state directory.
pub struct SlotRegistry {
    slots: Vec<Arc<TradeSlot>>,
    side_mode: SideMode,
}

impl SlotRegistry {
    pub fn new(slots: Vec<Arc<TradeSlot>>, side_mode: SideMode) -> Self {
        Self { slots, side_mode }
    }

    /// Build the standard per-side slot set.
    pub fn build(
        per_side: usize,
        side_mode: SideMode,
        state_dir: &Path,
        broker: Arc<dyn Broker>,
        prices: Arc<PriceCache>,
        params: SlotParams,
    ) -> EngineResult<Self> {
        let mut slots = Vec::with_capacity(per_side * 2);
        for (side, prefix) in [(OptionSide::Call, "CE"), (OptionSide::Put, "PE")] {
            for i in 1..=per_side {
                let name = format!("{prefix}_{i}");
                let file = state_dir.join(format!("{name}.json"));
                slots.push(TradeSlot::new(
                    name,
                    side,
                    file,
                    broker.clone(),
                    prices.clone(),
                    params.clone(),
                )?);
            }
        }
        Ok(Self::new(slots, side_mode))
    }

    pub fn slots(&self) -> &[Arc<TradeSlot>] {
        &self.slots
    }

    pub fn side_mode(&self) -> SideMode {
        self.side_mode
    }

    /// First free slot for the side, respecting the side mode.
    pub fn find_free(&self, side: OptionSide) -> Option<Arc<TradeSlot>> {
        if !self.side_mode.allows(side) {
            return None;
        }
        self.slots
            .iter()
            .find(|s| s.side() == side && s.is_free())
            .cloned()
    }

    /// True when any slot is holding or executing a trade in the symbol.
    pub fn symbol_live(&self, symbol: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.held_symbol().as_deref() == Some(symbol))
    }

    pub fn has_free(&self, side: OptionSide) -> bool {
        self.side_mode.allows(side) && self.slots.iter().any(|s| s.side() == side && s.is_free())
    }
}
