use std::fmt;

use anyhow::Result;
use dust_storm_core::{Event, Host};
use dust_storm_system_storm::StormController;
use dust_storm_world::{query, World};
use tracing::{debug, warn};

use crate::{
    scenario::{Scenario, SurfaceIndex},
    triggers::{dispatch, ScriptedTriggers, TriggerSource},
};

/// Headless run of a scenario: world, storm engine and trigger feed.
#[derive(Debug)]
pub(crate) struct Simulation<S> {
    world: World,
    controller: StormController,
    triggers: S,
    surfaces: SurfaceIndex,
    tally: EventTally,
    tick: u64,
    finished: bool,
}

impl Simulation<ScriptedTriggers> {
    /// Prepares a run from a validated scenario.
    pub(crate) fn from_scenario(scenario: &Scenario) -> Result<Self> {
        let (world, surfaces) = scenario.build_world()?;
        let triggers = ScriptedTriggers::new(&scenario.triggers, &surfaces)?;
        Ok(Self::new(
            world,
            StormController::new(scenario.storm.clone()),
            triggers,
            surfaces,
        ))
    }
}

impl<S: TriggerSource> Simulation<S> {
    /// Assembles a run from its parts.
    pub(crate) fn new(
        world: World,
        controller: StormController,
        triggers: S,
        surfaces: SurfaceIndex,
    ) -> Self {
        Self {
            world,
            controller,
            triggers,
            surfaces,
            tally: EventTally::default(),
            tick: 0,
            finished: false,
        }
    }

    /// Visits every scheduled tick up to and including `until`.
    ///
    /// Due triggers are dispatched before the storm engine runs on a tick.
    pub(crate) fn run_until(&mut self, until: u64) {
        let period = self.controller.config().tick_period.max(1);
        let mut due = Vec::new();
        let mut events = Vec::new();

        while !self.finished && self.tick <= until {
            self.triggers.due(self.tick, &mut due);
            for trigger in due.drain(..) {
                if let Err(reason) =
                    dispatch(&mut self.controller, &mut self.world, trigger, &mut events)
                {
                    debug!(tick = self.tick, %reason, "scripted trigger refused");
                }
            }
            self.controller
                .on_scheduled_tick(&mut self.world, self.tick, &mut events);
            self.world.drain_events(&mut events);

            for event in events.drain(..) {
                debug!(tick = self.tick, ?event, "event");
                self.tally.record(&event);
            }
            match self.tick.checked_add(period) {
                Some(next) => self.tick = next,
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if !self.triggers.is_exhausted() {
            warn!(until, "triggers scheduled past the final tick were not fired");
        }
    }

    /// Summarises the world after the run.
    #[must_use]
    pub(crate) fn report(&self) -> Report {
        let surfaces = self
            .surfaces
            .iter()
            .map(|(name, &surface)| {
                let counts = query::panel_counts(&self.world, surface);
                SurfaceReport {
                    name: name.clone(),
                    solar_multiplier: self.world.solar_multiplier(surface),
                    clean: counts.clean,
                    dusty: counts.dusty,
                    storm_active: self.controller.registry().contains(surface),
                }
            })
            .collect();
        Report {
            surfaces,
            tally: self.tally,
            ghosts: query::ghosts(&self.world).len(),
        }
    }
}

/// Running counts of the events observed during a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct EventTally {
    /// Storms installed.
    pub(crate) created: usize,
    /// Storm requests turned down.
    pub(crate) rejected: usize,
    /// Storms that ran to completion.
    pub(crate) expired: usize,
    /// Storms dropped because their surface vanished.
    pub(crate) abandoned: usize,
    /// Solar multiplier writes.
    pub(crate) signal_writes: usize,
    /// Clean panels turned dusty.
    pub(crate) degraded: usize,
    /// Dusty panels turned clean.
    pub(crate) restored: usize,
    /// Panels lost to recreation failures.
    pub(crate) lost: usize,
    /// Reconstruction requests raised by the host.
    pub(crate) reconstructions: usize,
}

impl EventTally {
    fn record(&mut self, event: &Event) {
        let counter = match event {
            Event::StormCreated { .. } => &mut self.created,
            Event::StormRejected { .. } => &mut self.rejected,
            Event::StormExpired { .. } => &mut self.expired,
            Event::StormAbandoned { .. } => &mut self.abandoned,
            Event::SolarMultiplierChanged { .. } => &mut self.signal_writes,
            Event::PanelDegraded { .. } => &mut self.degraded,
            Event::PanelRestored { .. } => &mut self.restored,
            Event::PanelRecreationFailed { .. } => &mut self.lost,
            Event::ReconstructionRequested { .. } => &mut self.reconstructions,
        };
        *counter += 1;
    }
}

/// Final state of one surface.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SurfaceReport {
    /// Surface name from the scenario.
    pub(crate) name: String,
    /// Current solar multiplier.
    pub(crate) solar_multiplier: Option<f64>,
    /// Clean panels on the surface.
    pub(crate) clean: usize,
    /// Dusty panels on the surface.
    pub(crate) dusty: usize,
    /// Whether a storm is still registered.
    pub(crate) storm_active: bool,
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Report {
    /// Per-surface summaries in name order.
    pub(crate) surfaces: Vec<SurfaceReport>,
    /// Event counts over the whole run.
    pub(crate) tally: EventTally,
    /// Outstanding reconstruction ghosts.
    pub(crate) ghosts: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>10} {:>6} {:>6} {:>6}",
            "surface", "multiplier", "clean", "dusty", "storm"
        )?;
        for surface in &self.surfaces {
            let multiplier = surface
                .solar_multiplier
                .map_or_else(|| "-".to_owned(), |value| format!("{value:.4}"));
            writeln!(
                f,
                "{:<12} {:>10} {:>6} {:>6} {:>6}",
                surface.name,
                multiplier,
                surface.clean,
                surface.dusty,
                if surface.storm_active { "yes" } else { "no" }
            )?;
        }
        let tally = &self.tally;
        writeln!(
            f,
            "storms: {} created, {} rejected, {} expired, {} abandoned, {} signal writes",
            tally.created, tally.rejected, tally.expired, tally.abandoned, tally.signal_writes
        )?;
        write!(
            f,
            "panels: {} degraded, {} restored, {} lost, {} reconstruction requests ({} ghosts)",
            tally.degraded, tally.restored, tally.lost, tally.reconstructions, self.ghosts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::DEFAULT_SCENARIO;

    fn bundled() -> Simulation<ScriptedTriggers> {
        let scenario = Scenario::from_toml(DEFAULT_SCENARIO).expect("bundled scenario parses");
        Simulation::from_scenario(&scenario).expect("bundled scenario builds")
    }

    #[test]
    fn bundled_scenario_runs_to_completion() {
        let mut simulation = bundled();
        simulation.run_until(7_200);
        let report = simulation.report();

        assert_eq!(report.tally.created, 1);
        assert_eq!(report.tally.expired, 1);
        assert_eq!(report.tally.lost, 1);

        let nauvis = report
            .surfaces
            .iter()
            .find(|surface| surface.name == "nauvis")
            .expect("nauvis reported");
        assert_eq!(nauvis.solar_multiplier, Some(1.0));
        assert!(!nauvis.storm_active);
        assert_eq!(nauvis.dusty, 0);
        assert_eq!(nauvis.clean, 96);

        let fulgora = report
            .surfaces
            .iter()
            .find(|surface| surface.name == "fulgora")
            .expect("fulgora reported");
        assert_eq!(fulgora.clean + fulgora.dusty, 7);
        assert_eq!(fulgora.dusty, 0);
    }

    #[test]
    fn resuming_a_run_matches_a_single_pass() {
        let mut single = bundled();
        single.run_until(7_200);

        let mut split = bundled();
        split.run_until(3_000);
        split.run_until(7_200);

        assert_eq!(single.report(), split.report());
    }

    #[test]
    fn run_stops_at_the_last_representable_tick() {
        let mut scenario = Scenario::from_toml(DEFAULT_SCENARIO).expect("bundled scenario parses");
        scenario.storm.tick_period = 1 << 62;
        scenario.triggers.clear();
        let mut simulation = Simulation::from_scenario(&scenario).expect("scenario builds");

        simulation.run_until(u64::MAX);
        assert!(simulation.finished);
        assert_eq!(simulation.tick, 3 << 62);

        simulation.run_until(u64::MAX);
        assert_eq!(simulation.tick, 3 << 62);
        assert_eq!(simulation.report().tally.created, 0);
    }

    #[test]
    fn report_lists_every_surface() {
        let report = bundled().report();
        let rendered = report.to_string();
        assert!(rendered.contains("nauvis"));
        assert!(rendered.contains("fulgora"));
    }
}
