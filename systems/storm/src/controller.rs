use dust_storm_core::{Command, Event, Host, StormRejection, SurfaceId};
use dust_storm_system_cleanliness::{degrade, force_clean, force_dusty, sweep_restore};
use dust_storm_system_sampling::binomial_approx;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{
    config::StormConfig,
    queue::{PanelQueue, ScoredPanel},
    record::StormRecord,
    registry::StormRegistry,
    scoring::normalize,
};

const RNG_STREAM_DEGRADATION: &str = "storm.degradation";

/// Parameters of a storm creation request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StormRequest {
    /// Surface that should host the storm.
    pub surface: SurfaceId,
    /// Maximum attenuation depth in `[0, 1]`.
    pub intensity: f64,
    /// Tick at which the storm begins.
    pub start_tick: u64,
    /// Number of ticks the storm lasts.
    pub duration: u64,
    /// Requested ramp length, clamped to half the duration.
    pub ramp_duration: f64,
}

/// Drives storm creation, per-tick updates and expiry.
///
/// The controller exclusively owns the [`StormRegistry`]; all mutation
/// happens synchronously inside [`StormController::create_storm`],
/// [`StormController::apply`] and the scheduler callbacks.
#[derive(Debug, Default)]
pub struct StormController {
    config: StormConfig,
    registry: StormRegistry,
}

impl StormController {
    /// Creates a controller with an empty registry.
    #[must_use]
    pub fn new(config: StormConfig) -> Self {
        Self::with_registry(config, StormRegistry::new())
    }

    /// Creates a controller that resumes a previously persisted registry.
    #[must_use]
    pub fn with_registry(config: StormConfig, registry: StormRegistry) -> Self {
        Self { config, registry }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StormConfig {
        &self.config
    }

    /// Read-only access to the registry.
    #[must_use]
    pub fn registry(&self) -> &StormRegistry {
        &self.registry
    }

    /// Tears the controller down, handing back the registry for persistence.
    #[must_use]
    pub fn into_registry(self) -> StormRegistry {
        self.registry
    }

    /// Executes an external trigger.
    ///
    /// Only storm creation can be refused; the bulk transitions always run and
    /// report their outcome through `out`.
    pub fn apply<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        command: Command,
        out: &mut Vec<Event>,
    ) -> Result<(), StormRejection> {
        match command {
            Command::CreateStorm {
                surface,
                intensity,
                start_tick,
                duration,
                ramp_duration,
            } => {
                let request = StormRequest {
                    surface,
                    intensity,
                    start_tick,
                    duration,
                    ramp_duration,
                };
                self.create_storm(&*host, request, out)
            }
            Command::ForceClean { surface } => {
                let report = force_clean(host, surface, out);
                info!(
                    surface = surface.get(),
                    restored = report.replaced,
                    failed = report.failed,
                    "forced clean"
                );
                Ok(())
            }
            Command::ForceDusty {
                surface,
                health_multiplier,
            } => {
                let report = force_dusty(host, surface, health_multiplier, out);
                info!(
                    surface = surface.get(),
                    degraded = report.replaced,
                    failed = report.failed,
                    "forced dusty"
                );
                Ok(())
            }
        }
    }

    /// Validates a request and installs a new storm.
    ///
    /// Rejections are reported through `out` and leave the registry untouched.
    /// No panel is mutated at creation time.
    pub fn create_storm<H: Host + ?Sized>(
        &mut self,
        host: &H,
        request: StormRequest,
        out: &mut Vec<Event>,
    ) -> Result<(), StormRejection> {
        if let Err(reason) = self.validate(host, &request) {
            warn!(surface = request.surface.get(), %reason, "storm rejected");
            out.push(Event::StormRejected {
                surface: request.surface,
                reason,
            });
            return Err(reason);
        }

        let eligible = self.score_panels(host, request.surface);
        let record = StormRecord::new(
            request.surface,
            request.intensity,
            request.start_tick,
            request.duration,
            request.ramp_duration,
            eligible,
            self.config.noise,
        );
        info!(
            surface = request.surface.get(),
            intensity = record.intensity(),
            start = record.start_tick(),
            end = record.end_tick(),
            ramp = record.ramp_duration(),
            eligible = record.eligible().len(),
            "storm created"
        );
        out.push(Event::StormCreated {
            surface: record.surface(),
            start_tick: record.start_tick(),
            end_tick: record.end_tick(),
            eligible: record.eligible().len(),
        });
        self.registry.insert(record);
        Ok(())
    }

    /// Advances every active storm to `current_tick`.
    ///
    /// Storms whose surface vanished or whose end tick passed are collected
    /// and removed only after the whole pass.
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H, current_tick: u64, out: &mut Vec<Event>) {
        let mut finished = Vec::new();

        for surface in self.registry.surfaces() {
            if !host.surface_exists(surface) {
                info!(surface = surface.get(), "storm abandoned, surface missing");
                out.push(Event::StormAbandoned { surface });
                self.registry.forget_baseline(surface);
                finished.push(surface);
                continue;
            }

            let baseline = self.registry.baseline(&*host, surface);
            let Some(record) = self.registry.get_mut(surface) else {
                continue;
            };

            if record.is_expired(current_tick) {
                host.set_solar_multiplier(surface, baseline);
                out.push(Event::SolarMultiplierChanged {
                    surface,
                    value: baseline,
                });
                info!(surface = surface.get(), tick = current_tick, "storm expired");
                out.push(Event::StormExpired {
                    surface,
                    tick: current_tick,
                });
                finished.push(surface);
                continue;
            }

            let Some(delta) = record.ramp_delta(current_tick) else {
                continue;
            };

            if delta < record.ramp_duration() + self.config.tick_period as f64 {
                let value = baseline * record.attenuation(delta);
                host.set_solar_multiplier(surface, value);
                debug!(surface = surface.get(), value, "solar multiplier updated");
                out.push(Event::SolarMultiplierChanged { surface, value });
            }

            let mut rng = degradation_rng(self.config.rng_seed, surface, current_tick);
            let probability = self.config.degradation_rate * record.intensity();
            let remaining = record.eligible().len() as u64;
            let count = binomial_approx(&mut rng, remaining, probability);
            if count > 0 {
                debug!(surface = surface.get(), count, remaining, "degrading panels");
            }

            let mut lost = 0usize;
            for _ in 0..count {
                let Some(entry) = record.eligible_mut().pop() else {
                    break;
                };
                if degrade(host, entry.panel, 1.0, out).is_err() {
                    lost += 1;
                }
            }
            if lost > 0 {
                debug!(surface = surface.get(), lost, "panels lost during degradation");
            }
        }

        for surface in finished {
            let _ = self.registry.remove(surface);
        }
    }

    /// Periodic scheduler callback: advances storms, then lets fully repaired
    /// dusty panels clean themselves on every surface.
    pub fn on_scheduled_tick<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        current_tick: u64,
        out: &mut Vec<Event>,
    ) {
        self.tick(host, current_tick, out);

        for surface in host.surfaces() {
            let report = sweep_restore(host, surface, out);
            if report.replaced > 0 || report.failed > 0 {
                debug!(
                    surface = surface.get(),
                    restored = report.replaced,
                    failed = report.failed,
                    "self-cleaning sweep"
                );
            }
        }
    }

    fn validate<H: Host + ?Sized>(
        &self,
        host: &H,
        request: &StormRequest,
    ) -> Result<(), StormRejection> {
        if self.registry.contains(request.surface) {
            return Err(StormRejection::AlreadyActive);
        }
        if !(0.0..=1.0).contains(&request.intensity) {
            return Err(StormRejection::IntensityOutOfRange(request.intensity));
        }
        if request.duration == 0 {
            return Err(StormRejection::NonPositiveDuration);
        }
        if !host.surface_exists(request.surface) {
            return Err(StormRejection::UnknownSurface);
        }
        Ok(())
    }

    fn score_panels<H: Host + ?Sized>(&self, host: &H, surface: SurfaceId) -> PanelQueue {
        let panels: Vec<_> = host
            .panels(surface)
            .into_iter()
            .filter(|panel| !panel.is_dusty())
            .collect();
        let mut scores: Vec<f64> = panels
            .iter()
            .map(|panel| self.config.noise.score(panel.position))
            .collect();
        normalize(&mut scores);

        let entries = panels
            .iter()
            .zip(scores)
            .map(|(panel, score)| ScoredPanel::new(panel.id, score))
            .collect();
        PanelQueue::from_scored(entries)
    }
}

fn degradation_rng(seed: u64, surface: SurfaceId, tick: u64) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(RNG_STREAM_DEGRADATION.as_bytes());
    hasher.update(surface.get().to_le_bytes());
    hasher.update(tick.to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ChaCha8Rng::from_seed(bytes)
}
