#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Panel cleanliness transitions.
//!
//! Panels never change state in place: a transition destroys the entity
//! without notifying other host systems and creates the opposite variant at
//! the same position, force and quality, carrying over a fraction of the prior
//! health. The bulk operations in this crate run outside the storm engine:
//! [`sweep_restore`] is the passive self-cleaning channel, while
//! [`force_clean`] and [`force_dusty`] back administrative triggers.

use dust_storm_core::{
    base_name, dusty_name, Event, Host, HostError, PanelId, PanelSnapshot, PanelSpec, SurfaceId,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Health ratio at or above which a dusty panel cleans itself.
pub const FULL_HEALTH_RATIO: f64 = 1.0;

/// Outcome of a single transition request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The panel was invalid, unmanaged, or already in the requested state.
    Unchanged,
    /// The panel was destroyed and recreated under a new handle.
    Replaced {
        /// Handle of the destroyed panel.
        from: PanelId,
        /// Handle of the replacement panel.
        to: PanelId,
    },
}

/// Failures raised while transitioning a panel.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The panel was destroyed but the host refused to create its replacement.
    #[error("panel {panel:?} was destroyed but `{name}` could not be created")]
    RecreationFailed {
        /// Handle of the destroyed panel.
        panel: PanelId,
        /// Prototype the host refused to create.
        name: String,
        /// Failure reported by the host.
        #[source]
        source: HostError,
    },
}

/// Totals accumulated by the bulk operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Panels successfully replaced.
    pub replaced: usize,
    /// Panels destroyed without a replacement.
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &Result<Transition, TransitionError>) {
        match outcome {
            Ok(Transition::Replaced { .. }) => self.replaced += 1,
            Ok(Transition::Unchanged) => {}
            Err(_) => self.failed += 1,
        }
    }
}

/// Replaces a clean panel with its dusty variant.
///
/// Invalid handles, unmanaged entities and panels that are already dusty are
/// left untouched.
pub fn degrade<H: Host + ?Sized>(
    host: &mut H,
    panel: PanelId,
    health_multiplier: f64,
    out: &mut Vec<Event>,
) -> Result<Transition, TransitionError> {
    let Some(snapshot) = host.panel(panel) else {
        return Ok(Transition::Unchanged);
    };
    if !snapshot.is_managed() || snapshot.is_dusty() {
        return Ok(Transition::Unchanged);
    }

    let target = dusty_name(&snapshot.name);
    let to = replace(host, &snapshot, target, health_multiplier, out)?;
    debug!(from = panel.get(), to = to.get(), "panel degraded");
    out.push(Event::PanelDegraded {
        surface: snapshot.surface,
        from: panel,
        to,
    });
    Ok(Transition::Replaced { from: panel, to })
}

/// Replaces a dusty panel with its base variant.
///
/// Invalid handles, unmanaged entities and clean panels are left untouched.
pub fn restore<H: Host + ?Sized>(
    host: &mut H,
    panel: PanelId,
    health_multiplier: f64,
    out: &mut Vec<Event>,
) -> Result<Transition, TransitionError> {
    let Some(snapshot) = host.panel(panel) else {
        return Ok(Transition::Unchanged);
    };
    if !snapshot.is_managed() || !snapshot.is_dusty() {
        return Ok(Transition::Unchanged);
    }

    let target = base_name(&snapshot.name).to_owned();
    let to = replace(host, &snapshot, target, health_multiplier, out)?;
    debug!(from = panel.get(), to = to.get(), "panel restored");
    out.push(Event::PanelRestored {
        surface: snapshot.surface,
        from: panel,
        to,
    });
    Ok(Transition::Replaced { from: panel, to })
}

/// Restores every dusty panel on the surface whose health ratio is full.
pub fn sweep_restore<H: Host + ?Sized>(
    host: &mut H,
    surface: SurfaceId,
    out: &mut Vec<Event>,
) -> SweepReport {
    let mut report = SweepReport::default();
    for panel in host.panels(surface) {
        if panel.is_dusty() && panel.health_ratio() >= FULL_HEALTH_RATIO {
            report.record(&restore(host, panel.id, 1.0, out));
        }
    }
    report
}

/// Restores every dusty panel on the surface regardless of health.
pub fn force_clean<H: Host + ?Sized>(
    host: &mut H,
    surface: SurfaceId,
    out: &mut Vec<Event>,
) -> SweepReport {
    let mut report = SweepReport::default();
    for panel in host.panels(surface) {
        if panel.is_dusty() {
            report.record(&restore(host, panel.id, 1.0, out));
        }
    }
    report
}

/// Degrades every clean panel on the surface.
pub fn force_dusty<H: Host + ?Sized>(
    host: &mut H,
    surface: SurfaceId,
    health_multiplier: f64,
    out: &mut Vec<Event>,
) -> SweepReport {
    let mut report = SweepReport::default();
    for panel in host.panels(surface) {
        if !panel.is_dusty() {
            report.record(&degrade(host, panel.id, health_multiplier, out));
        }
    }
    report
}

fn replace<H: Host + ?Sized>(
    host: &mut H,
    snapshot: &PanelSnapshot,
    name: String,
    health_multiplier: f64,
    out: &mut Vec<Event>,
) -> Result<PanelId, TransitionError> {
    let spec = PanelSpec {
        surface: snapshot.surface,
        name,
        position: snapshot.position,
        force: snapshot.force,
        quality: snapshot.quality,
        health: snapshot.health * health_multiplier,
    };
    let name = spec.name.clone();
    let _ = host.destroy_panel(snapshot.id, false);

    host.create_panel(spec).map_err(|source| {
        warn!(
            panel = snapshot.id.get(),
            name = %name,
            error = %source,
            "panel recreation failed"
        );
        out.push(Event::PanelRecreationFailed {
            surface: snapshot.surface,
            panel: snapshot.id,
            name: name.clone(),
            reason: source.clone(),
        });
        TransitionError::RecreationFailed {
            panel: snapshot.id,
            name,
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_report_counts_outcomes() {
        let mut report = SweepReport::default();
        report.record(&Ok(Transition::Unchanged));
        report.record(&Ok(Transition::Replaced {
            from: PanelId::new(1),
            to: PanelId::new(2),
        }));
        report.record(&Err(TransitionError::RecreationFailed {
            panel: PanelId::new(3),
            name: "solar-panel".to_owned(),
            source: HostError::UnknownPrototype("solar-panel".to_owned()),
        }));
        assert_eq!(
            report,
            SweepReport {
                replaced: 1,
                failed: 1
            }
        );
    }
}
