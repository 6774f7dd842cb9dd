use std::collections::VecDeque;

use anyhow::{Context, Result};
use dust_storm_core::{Command, Event, StormRejection, SurfaceId};
use dust_storm_system_storm::StormController;
use dust_storm_world::World;
use tracing::info;

use crate::scenario::{ScriptedTrigger, SurfaceIndex};

/// Trigger resolved against the world's surface identifiers.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Trigger {
    /// Command handled by the storm engine.
    Command(Command),
    /// Field repair of every entity on a surface.
    Repair(SurfaceId),
}

/// Producer of triggers that become due as simulated time advances.
pub(crate) trait TriggerSource {
    /// Moves every trigger due at or before `tick` into `out`, in firing order.
    fn due(&mut self, tick: u64, out: &mut Vec<Trigger>);

    /// Reports whether the source will never produce another trigger.
    fn is_exhausted(&self) -> bool;
}

/// Triggers read from a scenario file.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTriggers {
    pending: VecDeque<(u64, Trigger)>,
}

impl ScriptedTriggers {
    /// Resolves scripted triggers, ordering them by firing tick.
    ///
    /// Triggers sharing a tick keep their declaration order.
    pub(crate) fn new(triggers: &[ScriptedTrigger], surfaces: &SurfaceIndex) -> Result<Self> {
        let mut resolved = triggers
            .iter()
            .map(|trigger| {
                let surface = surfaces
                    .get(trigger.surface())
                    .copied()
                    .with_context(|| format!("unknown surface {}", trigger.surface()))?;
                Ok((trigger.tick(), resolve(trigger, surface)))
            })
            .collect::<Result<Vec<_>>>()?;
        resolved.sort_by_key(|(tick, _)| *tick);
        Ok(Self {
            pending: resolved.into(),
        })
    }
}

impl TriggerSource for ScriptedTriggers {
    fn due(&mut self, tick: u64, out: &mut Vec<Trigger>) {
        while self.pending.front().is_some_and(|(at, _)| *at <= tick) {
            if let Some((_, trigger)) = self.pending.pop_front() {
                out.push(trigger);
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

fn resolve(trigger: &ScriptedTrigger, surface: SurfaceId) -> Trigger {
    match *trigger {
        ScriptedTrigger::CreateStorm {
            tick,
            intensity,
            start_tick,
            duration,
            ramp_duration,
            ..
        } => Trigger::Command(Command::CreateStorm {
            surface,
            intensity,
            start_tick: start_tick.unwrap_or(tick),
            duration,
            ramp_duration,
        }),
        ScriptedTrigger::ForceClean { .. } => Trigger::Command(Command::ForceClean { surface }),
        ScriptedTrigger::ForceDusty {
            health_multiplier,
            ..
        } => Trigger::Command(Command::ForceDusty {
            surface,
            health_multiplier,
        }),
        ScriptedTrigger::Repair { .. } => Trigger::Repair(surface),
    }
}

/// Routes a trigger to the storm engine or the world.
pub(crate) fn dispatch(
    controller: &mut StormController,
    world: &mut World,
    trigger: Trigger,
    out: &mut Vec<Event>,
) -> Result<(), StormRejection> {
    match trigger {
        Trigger::Command(command) => controller.apply(world, command, out),
        Trigger::Repair(surface) => {
            info!(surface = surface.get(), "field repair");
            world.repair_all(surface);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use dust_storm_system_storm::StormConfig;

    use super::*;

    fn index() -> SurfaceIndex {
        SurfaceIndex::from([
            ("nauvis".to_owned(), SurfaceId::new(0)),
            ("fulgora".to_owned(), SurfaceId::new(1)),
        ])
    }

    fn repair(tick: u64, surface: &str) -> ScriptedTrigger {
        ScriptedTrigger::Repair {
            tick,
            surface: surface.to_owned(),
        }
    }

    #[test]
    fn triggers_fire_in_tick_order() {
        let mut source = ScriptedTriggers::new(
            &[repair(120, "nauvis"), repair(0, "fulgora"), repair(120, "fulgora")],
            &index(),
        )
        .expect("surfaces resolve");

        let mut due = Vec::new();
        source.due(60, &mut due);
        assert_eq!(due, vec![Trigger::Repair(SurfaceId::new(1))]);

        due.clear();
        source.due(180, &mut due);
        assert_eq!(
            due,
            vec![
                Trigger::Repair(SurfaceId::new(0)),
                Trigger::Repair(SurfaceId::new(1)),
            ]
        );
        assert!(source.is_exhausted());
    }

    #[test]
    fn storm_start_defaults_to_firing_tick() {
        let trigger = ScriptedTrigger::CreateStorm {
            tick: 300,
            surface: "nauvis".to_owned(),
            intensity: 0.5,
            start_tick: None,
            duration: 600,
            ramp_duration: 60.0,
        };
        let mut source = ScriptedTriggers::new(&[trigger], &index()).expect("surfaces resolve");
        let mut due = Vec::new();
        source.due(300, &mut due);
        assert_eq!(
            due,
            vec![Trigger::Command(Command::CreateStorm {
                surface: SurfaceId::new(0),
                intensity: 0.5,
                start_tick: 300,
                duration: 600,
                ramp_duration: 60.0,
            })]
        );
    }

    #[test]
    fn unresolvable_surface_is_an_error() {
        assert!(ScriptedTriggers::new(&[repair(0, "gleba")], &index()).is_err());
    }

    #[test]
    fn dispatch_routes_commands_to_the_controller() {
        let mut world = World::new();
        let surface = world.add_default_surface("nauvis");
        let mut controller = StormController::new(StormConfig::default());
        let mut events = Vec::new();

        dispatch(
            &mut controller,
            &mut world,
            Trigger::Command(Command::CreateStorm {
                surface,
                intensity: 0.5,
                start_tick: 0,
                duration: 600,
                ramp_duration: 60.0,
            }),
            &mut events,
        )
        .expect("storm accepted");
        assert!(controller.registry().contains(surface));
        assert!(matches!(events.as_slice(), [Event::StormCreated { .. }]));
    }

    #[test]
    fn dispatch_hands_back_rejections() {
        let mut world = World::new();
        let surface = world.add_default_surface("nauvis");
        let mut controller = StormController::new(StormConfig::default());
        let mut events = Vec::new();
        let storm = Trigger::Command(Command::CreateStorm {
            surface,
            intensity: 0.5,
            start_tick: 0,
            duration: 600,
            ramp_duration: 60.0,
        });

        assert_eq!(
            dispatch(&mut controller, &mut world, storm.clone(), &mut events),
            Ok(())
        );
        assert_eq!(
            dispatch(&mut controller, &mut world, storm, &mut events),
            Err(StormRejection::AlreadyActive)
        );
        assert_eq!(
            dispatch(&mut controller, &mut world, Trigger::Repair(surface), &mut events),
            Ok(())
        );
    }
}
