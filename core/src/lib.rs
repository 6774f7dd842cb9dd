#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the dust storm engine.
//!
//! This crate defines the surface that connects adapters, the host that owns
//! surfaces and panels, and the pure systems. Adapters submit [`Command`]
//! values describing operator triggers, systems mutate panels exclusively
//! through the [`Host`] capability trait, and every observable outcome is
//! reported as an [`Event`] so adapters can log or replay it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix appended to a base panel prototype name to form its dusty variant.
pub const DUSTY_SUFFIX: &str = "-dusty";

/// Commands issued by external triggers such as scripted events or user input.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests a new storm on the provided surface.
    CreateStorm {
        /// Surface that should host the storm.
        surface: SurfaceId,
        /// Maximum attenuation depth in `[0, 1]`.
        intensity: f64,
        /// Tick at which the storm begins.
        start_tick: u64,
        /// Number of ticks the storm lasts.
        duration: u64,
        /// Requested length of the ramp-up and ramp-down windows in ticks.
        ramp_duration: f64,
    },
    /// Restores every dusty panel on the surface, bypassing the storm engine.
    ForceClean {
        /// Surface whose panels should be cleaned.
        surface: SurfaceId,
    },
    /// Degrades every clean panel on the surface, bypassing the storm engine.
    ForceDusty {
        /// Surface whose panels should be degraded.
        surface: SurfaceId,
        /// Fraction of prior health carried over to the dusty variant.
        health_multiplier: f64,
    },
}

/// Events broadcast by systems and the host after processing work.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a storm was installed on a surface.
    StormCreated {
        /// Surface hosting the storm.
        surface: SurfaceId,
        /// Tick at which the storm begins.
        start_tick: u64,
        /// Last tick covered by the storm.
        end_tick: u64,
        /// Number of panels scored as eligible for degradation.
        eligible: usize,
    },
    /// Reports that a storm creation request was rejected.
    StormRejected {
        /// Surface named in the request.
        surface: SurfaceId,
        /// Specific reason the request failed.
        reason: StormRejection,
    },
    /// Confirms that a storm ran past its end tick and was removed.
    StormExpired {
        /// Surface that hosted the storm.
        surface: SurfaceId,
        /// Tick at which the expiry was observed.
        tick: u64,
    },
    /// Reports that a storm was dropped because its surface no longer exists.
    StormAbandoned {
        /// Surface that disappeared.
        surface: SurfaceId,
    },
    /// Announces a write to a surface's solar multiplier.
    SolarMultiplierChanged {
        /// Surface whose signal changed.
        surface: SurfaceId,
        /// Value written to the host.
        value: f64,
    },
    /// Confirms that a clean panel was replaced by its dusty variant.
    PanelDegraded {
        /// Surface containing the panel.
        surface: SurfaceId,
        /// Handle of the destroyed clean panel.
        from: PanelId,
        /// Handle of the newly created dusty panel.
        to: PanelId,
    },
    /// Confirms that a dusty panel was replaced by its base variant.
    PanelRestored {
        /// Surface containing the panel.
        surface: SurfaceId,
        /// Handle of the destroyed dusty panel.
        from: PanelId,
        /// Handle of the newly created clean panel.
        to: PanelId,
    },
    /// Reports that a panel was destroyed but its replacement could not be created.
    PanelRecreationFailed {
        /// Surface containing the panel.
        surface: SurfaceId,
        /// Handle of the destroyed panel.
        panel: PanelId,
        /// Prototype name that failed to be created.
        name: String,
        /// Host failure returned by the create primitive.
        reason: HostError,
    },
    /// Asks a rebuild system to reconstruct the base variant of a lost dusty panel.
    ReconstructionRequested {
        /// Surface the panel stood on.
        surface: SurfaceId,
        /// Prototype name that should be rebuilt.
        base_name: String,
        /// Position the panel occupied.
        position: Position,
        /// Force that owned the panel.
        force: ForceId,
        /// Quality tier of the panel.
        quality: Quality,
    },
}

/// Identifier of an independently simulated surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u32);

impl SurfaceId {
    /// Creates a new surface identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle to a host-owned panel.
///
/// Handles are never reused by the host: destroying a panel invalidates its
/// handle permanently, and the replacement receives a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PanelId(u64);

impl PanelId {
    /// Creates a new panel handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of the force that owns an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForceId(u32);

impl ForceId {
    /// Creates a new force identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Quality tier carried across panel transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Baseline quality.
    #[default]
    Normal,
    /// First upgraded tier.
    Uncommon,
    /// Second upgraded tier.
    Rare,
    /// Third upgraded tier.
    Epic,
    /// Highest tier.
    Legendary,
}

/// Location of an entity on its surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate in tiles.
    pub x: f64,
    /// Vertical coordinate in tiles.
    pub y: f64,
}

impl Position {
    /// Creates a position from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Broad entity categories exposed by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Solar panel, the only type managed by the storm engine.
    SolarPanel,
    /// Any other entity the host tracks.
    Other,
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelSnapshot {
    /// Handle allocated by the host.
    pub id: PanelId,
    /// Surface the entity stands on.
    pub surface: SurfaceId,
    /// Prototype name, carrying [`DUSTY_SUFFIX`] for degraded panels.
    pub name: String,
    /// Entity category.
    pub kind: EntityKind,
    /// Position on the surface.
    pub position: Position,
    /// Owning force.
    pub force: ForceId,
    /// Quality tier.
    pub quality: Quality,
    /// Current health.
    pub health: f64,
    /// Maximum health of the prototype.
    pub max_health: f64,
}

impl PanelSnapshot {
    /// Reports whether the entity is a managed solar panel.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.kind == EntityKind::SolarPanel
    }

    /// Reports whether the entity is the dusty variant.
    #[must_use]
    pub fn is_dusty(&self) -> bool {
        is_dusty(&self.name)
    }

    /// Current health divided by maximum health, zero for prototypes without health.
    #[must_use]
    pub fn health_ratio(&self) -> f64 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            self.health / self.max_health
        }
    }
}

/// Everything a host needs to create an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelSpec {
    /// Surface that receives the entity.
    pub surface: SurfaceId,
    /// Prototype name to instantiate.
    pub name: String,
    /// Position of the new entity.
    pub position: Position,
    /// Owning force.
    pub force: ForceId,
    /// Quality tier.
    pub quality: Quality,
    /// Initial health, clamped by the host to the prototype's maximum.
    pub health: f64,
}

/// Failures signalled by the host's create primitive.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HostError {
    /// The target surface does not exist.
    #[error("surface {0:?} does not exist")]
    MissingSurface(SurfaceId),
    /// No prototype with the provided name is registered.
    #[error("unknown prototype `{0}`")]
    UnknownPrototype(String),
    /// The requested position cannot host the entity.
    #[error("placement blocked at ({x}, {y})")]
    PlacementBlocked {
        /// Horizontal coordinate of the rejected placement.
        x: i64,
        /// Vertical coordinate of the rejected placement.
        y: i64,
    },
}

/// Reasons a storm creation request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum StormRejection {
    /// A storm is already active on the surface.
    #[error("a storm is already active on the surface")]
    AlreadyActive,
    /// The requested intensity lies outside `[0, 1]`.
    #[error("intensity {0} lies outside [0, 1]")]
    IntensityOutOfRange(f64),
    /// The requested duration is zero.
    #[error("storm duration must be positive")]
    NonPositiveDuration,
    /// The surface does not exist.
    #[error("surface does not exist")]
    UnknownSurface,
}

/// Capability interface the host environment provides to the storm engine.
///
/// Systems never hold on to snapshots across a destroy boundary; after any
/// create they re-resolve through [`Host::panel`] or [`Host::panels`].
pub trait Host {
    /// Lists every surface currently known to the host.
    fn surfaces(&self) -> Vec<SurfaceId>;

    /// Reports whether the surface still exists.
    fn surface_exists(&self, surface: SurfaceId) -> bool;

    /// Enumerates the managed-type panels standing on the surface.
    fn panels(&self, surface: SurfaceId) -> Vec<PanelSnapshot>;

    /// Resolves a handle, returning `None` once the entity is no longer valid.
    fn panel(&self, panel: PanelId) -> Option<PanelSnapshot>;

    /// Destroys an entity. When `notify` is false no destruction notification
    /// is propagated to other host systems. Returns whether anything was destroyed.
    fn destroy_panel(&mut self, panel: PanelId, notify: bool) -> bool;

    /// Creates an entity, signalling failure distinctly from success.
    fn create_panel(&mut self, spec: PanelSpec) -> Result<PanelId, HostError>;

    /// Reads the surface's current solar multiplier.
    fn solar_multiplier(&self, surface: SurfaceId) -> Option<f64>;

    /// Writes the surface's solar multiplier.
    fn set_solar_multiplier(&mut self, surface: SurfaceId, value: f64);
}

/// Derives the dusty variant name for a base prototype.
#[must_use]
pub fn dusty_name(base: &str) -> String {
    format!("{base}{DUSTY_SUFFIX}")
}

/// Reports whether a prototype name denotes the dusty variant.
#[must_use]
pub fn is_dusty(name: &str) -> bool {
    name.ends_with(DUSTY_SUFFIX)
}

/// Strips the dusty marker, returning the base prototype name.
#[must_use]
pub fn base_name(name: &str) -> &str {
    name.strip_suffix(DUSTY_SUFFIX).unwrap_or(name)
}
