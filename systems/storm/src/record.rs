use dust_storm_core::SurfaceId;
use serde::{Deserialize, Serialize};

use crate::{
    queue::{PanelQueue, ReservePanels},
    ramp::ramp,
    scoring::NoiseParams,
};

/// Smallest ramp length a storm may carry, keeping `delta / ramp_duration` finite.
pub const MIN_RAMP_DURATION: f64 = 1e-9;

/// Lifecycle stage of a storm relative to a given tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StormPhase {
    /// The signal is descending towards its floor. Ticks before the start
    /// tick also report this stage.
    RampingUp,
    /// The signal sits at its floor.
    Steady,
    /// The signal is recovering towards its baseline.
    RampingDown,
    /// The end tick has passed; the storm is due for removal.
    Expired,
}

/// State of a single storm on a surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StormRecord {
    surface: SurfaceId,
    intensity: f64,
    start_tick: u64,
    duration: u64,
    ramp_duration: f64,
    eligible: PanelQueue,
    reserve: ReservePanels,
    noise: NoiseParams,
}

impl StormRecord {
    /// Assembles a record. The ramp length is clamped into
    /// `[MIN_RAMP_DURATION, duration / 2]`.
    #[must_use]
    pub fn new(
        surface: SurfaceId,
        intensity: f64,
        start_tick: u64,
        duration: u64,
        ramp_duration: f64,
        eligible: PanelQueue,
        noise: NoiseParams,
    ) -> Self {
        let half = duration as f64 / 2.0;
        Self {
            surface,
            intensity,
            start_tick,
            duration,
            ramp_duration: ramp_duration.min(half).max(MIN_RAMP_DURATION),
            eligible,
            reserve: ReservePanels::default(),
            noise,
        }
    }

    /// Surface hosting the storm.
    #[must_use]
    pub const fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Maximum attenuation depth.
    #[must_use]
    pub const fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Tick at which the storm begins.
    #[must_use]
    pub const fn start_tick(&self) -> u64 {
        self.start_tick
    }

    /// Number of ticks the storm lasts.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.duration
    }

    /// Last tick covered by the storm.
    #[must_use]
    pub const fn end_tick(&self) -> u64 {
        self.start_tick.saturating_add(self.duration)
    }

    /// Length of the ramp-up and ramp-down windows after clamping.
    #[must_use]
    pub const fn ramp_duration(&self) -> f64 {
        self.ramp_duration
    }

    /// Scoring variant used to order the eligible panels.
    #[must_use]
    pub const fn noise(&self) -> NoiseParams {
        self.noise
    }

    /// Panels still awaiting degradation, lowest score at the tail.
    #[must_use]
    pub const fn eligible(&self) -> &PanelQueue {
        &self.eligible
    }

    /// Panels that became eligible after the storm started.
    #[must_use]
    pub const fn reserve(&self) -> &ReservePanels {
        &self.reserve
    }

    pub(crate) fn eligible_mut(&mut self) -> &mut PanelQueue {
        &mut self.eligible
    }

    /// Reports whether `tick` lies beyond the storm's end.
    #[must_use]
    pub const fn is_expired(&self, tick: u64) -> bool {
        tick > self.end_tick()
    }

    /// Ticks since the start or until the end, whichever is smaller.
    ///
    /// Ticks before the start yield zero. Returns `None` after expiry.
    #[must_use]
    pub fn ramp_delta(&self, tick: u64) -> Option<f64> {
        if self.is_expired(tick) {
            return None;
        }
        let elapsed = tick.saturating_sub(self.start_tick);
        let remaining = self.end_tick() - tick;
        Some(elapsed.min(remaining) as f64)
    }

    /// Multiplicative factor applied to the baseline signal for a ramp delta.
    #[must_use]
    pub fn attenuation(&self, delta: f64) -> f64 {
        1.0 - ramp(delta / self.ramp_duration) * self.intensity
    }

    /// Lifecycle stage at `tick`.
    #[must_use]
    pub fn phase(&self, tick: u64) -> StormPhase {
        if self.is_expired(tick) {
            return StormPhase::Expired;
        }

        let elapsed = tick.saturating_sub(self.start_tick) as f64;
        let remaining = (self.end_tick() - tick) as f64;
        if elapsed < self.ramp_duration {
            StormPhase::RampingUp
        } else if remaining < self.ramp_duration {
            StormPhase::RampingDown
        } else {
            StormPhase::Steady
        }
    }
}
