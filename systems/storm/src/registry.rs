use std::collections::BTreeMap;

use dust_storm_core::{Host, SurfaceId};
use serde::{Deserialize, Serialize};

use crate::record::StormRecord;

/// Baseline assumed when the host cannot report a surface's multiplier.
pub const DEFAULT_BASELINE: f64 = 1.0;

/// Process-wide store of active storms and cached baselines.
///
/// Holds at most one storm per surface. The store is plain data so a host can
/// persist it in its key-value storage and hand it back on load.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StormRegistry {
    storms: BTreeMap<SurfaceId, StormRecord>,
    baselines: BTreeMap<SurfaceId, f64>,
}

impl StormRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every storm and cached baseline.
    pub fn reset(&mut self) {
        self.storms.clear();
        self.baselines.clear();
    }

    /// Reports whether a storm is active on the surface.
    #[must_use]
    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.storms.contains_key(&surface)
    }

    /// Retrieves the storm active on the surface, if any.
    #[must_use]
    pub fn get(&self, surface: SurfaceId) -> Option<&StormRecord> {
        self.storms.get(&surface)
    }

    /// Number of active storms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storms.len()
    }

    /// Reports whether no storm is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storms.is_empty()
    }

    /// Iterates active storms in ascending surface order.
    pub fn iter(&self) -> impl Iterator<Item = &StormRecord> {
        self.storms.values()
    }

    /// Returns the cached baseline for the surface without touching the host.
    #[must_use]
    pub fn cached_baseline(&self, surface: SurfaceId) -> Option<f64> {
        self.baselines.get(&surface).copied()
    }

    /// Returns the surface's baseline multiplier, capturing it from the host
    /// on first access.
    pub fn baseline<H: Host + ?Sized>(&mut self, host: &H, surface: SurfaceId) -> f64 {
        *self.baselines.entry(surface).or_insert_with(|| {
            host.solar_multiplier(surface)
                .unwrap_or(DEFAULT_BASELINE)
        })
    }

    /// Forgets the cached baseline of a surface that no longer exists.
    pub fn forget_baseline(&mut self, surface: SurfaceId) {
        let _ = self.baselines.remove(&surface);
    }

    /// Removes and returns the storm active on the surface.
    pub fn remove(&mut self, surface: SurfaceId) -> Option<StormRecord> {
        self.storms.remove(&surface)
    }

    pub(crate) fn surfaces(&self) -> Vec<SurfaceId> {
        self.storms.keys().copied().collect()
    }

    pub(crate) fn get_mut(&mut self, surface: SurfaceId) -> Option<&mut StormRecord> {
        self.storms.get_mut(&surface)
    }

    /// Installs a record; the caller guarantees the surface is free.
    pub(crate) fn insert(&mut self, record: StormRecord) {
        let previous = self.storms.insert(record.surface(), record);
        debug_assert!(previous.is_none(), "storm replaced an active storm");
    }
}
