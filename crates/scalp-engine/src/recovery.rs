//! Startup recovery.

use crate::registry::SlotRegistry;
use tracing::info;

/// Square every restored slot with the broker before the first live
/// tick. Runs once, sequentially; the engine starts only after this
/// completes.
pub async fn run_startup_recovery(registry: &SlotRegistry) {
    let occupied = registry
        .slots()
        .iter()
        .filter(|s| !s.is_free())
        .count();
    if occupied == 0 {
        info!("no restored trades, recovery skipped");
        return;
    }
    info!(occupied, "recovering restored trades");
    for slot in registry.slots() {
        slot.recover().await;
    }
}
