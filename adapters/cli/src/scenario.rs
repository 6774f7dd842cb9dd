use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use dust_storm_core::{dusty_name, ForceId, Host, PanelSpec, Position, Quality, SurfaceId};
use dust_storm_system_storm::StormConfig;
use dust_storm_world::World;
use serde::Deserialize;

/// Scenario bundled into the binary, used when no file is supplied.
pub(crate) const DEFAULT_SCENARIO: &str = include_str!("../scenarios/default.toml");

const DEFAULT_UNTIL: u64 = 7_200;
const DEFAULT_SPACING: f64 = 3.0;

/// Complete description of a simulation run.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Last tick the scheduler visits.
    #[serde(default = "default_until")]
    pub(crate) until: u64,
    /// Storm engine tuning.
    #[serde(default)]
    pub(crate) storm: StormConfig,
    /// Panel prototypes available to the layouts.
    #[serde(default)]
    pub(crate) prototypes: Vec<PrototypeSpec>,
    /// Surfaces created before the first tick.
    pub(crate) surfaces: Vec<SurfaceSpec>,
    /// Triggers fired on the way.
    #[serde(default)]
    pub(crate) triggers: Vec<ScriptedTrigger>,
}

/// Solar panel prototype; its dusty variant is derived automatically.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrototypeSpec {
    /// Base prototype name.
    pub(crate) name: String,
    /// Maximum health of the clean variant.
    pub(crate) max_health: f64,
}

/// Surface together with its initial panel layout.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SurfaceSpec {
    /// Unique surface name referenced by triggers.
    pub(crate) name: String,
    /// Baseline solar multiplier.
    #[serde(default = "default_multiplier")]
    pub(crate) solar_multiplier: f64,
    /// Tiles blocked once the layout has been placed.
    #[serde(default)]
    pub(crate) blocked: Vec<[i64; 2]>,
    /// Rectangular panel grids.
    #[serde(default)]
    pub(crate) panels: Vec<PanelGrid>,
}

/// Rectangular block of identical panels.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PanelGrid {
    /// Base prototype of every panel in the grid.
    pub(crate) prototype: String,
    /// Position of the first panel.
    pub(crate) origin: [f64; 2],
    /// Panels per row.
    pub(crate) columns: u32,
    /// Number of rows.
    pub(crate) rows: u32,
    /// Distance between neighbouring panels.
    #[serde(default = "default_spacing")]
    pub(crate) spacing: f64,
    /// Owning force.
    #[serde(default = "default_force")]
    pub(crate) force: u32,
    /// Quality tier.
    #[serde(default)]
    pub(crate) quality: Quality,
    /// Places the dusty variant instead of the clean one.
    #[serde(default)]
    pub(crate) dusty: bool,
}

/// Trigger scheduled for a given tick, addressed by surface name.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) enum ScriptedTrigger {
    /// Starts a storm.
    CreateStorm {
        /// Tick at which the trigger fires.
        tick: u64,
        /// Target surface.
        surface: String,
        /// Attenuation depth.
        intensity: f64,
        /// Storm start; defaults to the firing tick.
        start_tick: Option<u64>,
        /// Storm length in ticks.
        duration: u64,
        /// Requested ramp length in ticks.
        ramp_duration: f64,
    },
    /// Restores every dusty panel on a surface.
    ForceClean {
        /// Tick at which the trigger fires.
        tick: u64,
        /// Target surface.
        surface: String,
    },
    /// Degrades every clean panel on a surface.
    ForceDusty {
        /// Tick at which the trigger fires.
        tick: u64,
        /// Target surface.
        surface: String,
        /// Health scale applied to the recreated panels.
        #[serde(default = "default_multiplier")]
        health_multiplier: f64,
    },
    /// Repairs every entity on a surface to full health.
    Repair {
        /// Tick at which the trigger fires.
        tick: u64,
        /// Target surface.
        surface: String,
    },
}

impl ScriptedTrigger {
    /// Tick at which the trigger fires.
    #[must_use]
    pub(crate) fn tick(&self) -> u64 {
        match self {
            Self::CreateStorm { tick, .. }
            | Self::ForceClean { tick, .. }
            | Self::ForceDusty { tick, .. }
            | Self::Repair { tick, .. } => *tick,
        }
    }

    /// Name of the surface the trigger targets.
    #[must_use]
    pub(crate) fn surface(&self) -> &str {
        match self {
            Self::CreateStorm { surface, .. }
            | Self::ForceClean { surface, .. }
            | Self::ForceDusty { surface, .. }
            | Self::Repair { surface, .. } => surface,
        }
    }
}

/// Maps surface names to the identifiers assigned by the world.
pub(crate) type SurfaceIndex = BTreeMap<String, SurfaceId>;

impl Scenario {
    /// Parses and validates a scenario from TOML text.
    pub(crate) fn from_toml(content: &str) -> Result<Self> {
        let scenario = toml::from_str::<Self>(content).context("invalid scenario file")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reads a scenario from disk.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in scenario {}", path.display()))
    }

    /// Checks cross references and value ranges.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(self.storm.tick_period > 0, "tick period must be positive");
        ensure!(
            self.storm.degradation_rate.is_finite() && self.storm.degradation_rate >= 0.0,
            "degradation rate must be a non-negative number"
        );
        ensure!(!self.surfaces.is_empty(), "scenario declares no surfaces");

        let mut prototypes = HashSet::new();
        for prototype in &self.prototypes {
            ensure!(
                prototype.max_health > 0.0,
                "prototype {} needs a positive max health",
                prototype.name
            );
            if !prototypes.insert(prototype.name.as_str()) {
                bail!("prototype {} declared twice", prototype.name);
            }
        }

        let mut surfaces = HashSet::new();
        for surface in &self.surfaces {
            if !surfaces.insert(surface.name.as_str()) {
                bail!("surface {} declared twice", surface.name);
            }
            for grid in &surface.panels {
                ensure!(
                    prototypes.contains(grid.prototype.as_str()),
                    "surface {} places unknown prototype {}",
                    surface.name,
                    grid.prototype
                );
            }
        }

        for trigger in &self.triggers {
            ensure!(
                surfaces.contains(trigger.surface()),
                "trigger at tick {} targets unknown surface {}",
                trigger.tick(),
                trigger.surface()
            );
        }
        Ok(())
    }

    /// Builds the world described by the scenario.
    pub(crate) fn build_world(&self) -> Result<(World, SurfaceIndex)> {
        let mut world = World::new();
        let mut max_health = BTreeMap::new();
        for prototype in &self.prototypes {
            world.register_panel_prototype(&prototype.name, prototype.max_health);
            let _ = max_health.insert(prototype.name.as_str(), prototype.max_health);
        }

        let mut index = SurfaceIndex::new();
        for spec in &self.surfaces {
            let surface = world.add_surface(&spec.name, spec.solar_multiplier);
            let _ = index.insert(spec.name.clone(), surface);

            for grid in &spec.panels {
                let health = max_health
                    .get(grid.prototype.as_str())
                    .copied()
                    .with_context(|| format!("unknown prototype {}", grid.prototype))?;
                place_grid(&mut world, surface, grid, health)
                    .with_context(|| format!("failed to lay out surface {}", spec.name))?;
            }
            for &[x, y] in &spec.blocked {
                world.block_tile(surface, x, y);
            }
        }
        Ok((world, index))
    }
}

fn place_grid(world: &mut World, surface: SurfaceId, grid: &PanelGrid, health: f64) -> Result<()> {
    let name = if grid.dusty {
        dusty_name(&grid.prototype)
    } else {
        grid.prototype.clone()
    };
    for row in 0..grid.rows {
        for column in 0..grid.columns {
            let position = Position::new(
                grid.origin[0] + f64::from(column) * grid.spacing,
                grid.origin[1] + f64::from(row) * grid.spacing,
            );
            let _ = world.create_panel(PanelSpec {
                surface,
                name: name.clone(),
                position,
                force: ForceId::new(grid.force),
                quality: grid.quality,
                health,
            })?;
        }
    }
    Ok(())
}

fn default_until() -> u64 {
    DEFAULT_UNTIL
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_spacing() -> f64 {
    DEFAULT_SPACING
}

fn default_force() -> u32 {
    1
}
