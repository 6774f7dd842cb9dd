#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory authoritative host for the dust storm engine.
//!
//! The [`World`] owns surfaces, panel prototypes, entities and the per-surface
//! solar multiplier, and exposes them to systems through the
//! [`Host`](dust_storm_core::Host) capability trait. Adapters use the inherent
//! methods to build scenarios and to simulate the unrelated host systems
//! (repair, deconstruction) that interact with storms.

use std::collections::{BTreeMap, HashMap, HashSet};

use dust_storm_core::{
    base_name, dusty_name, is_dusty, EntityKind, Event, ForceId, Host, HostError, PanelId,
    PanelSnapshot, PanelSpec, Position, Quality, SurfaceId,
};

/// Maximum health of a derived dusty prototype relative to its base prototype.
///
/// A freshly degraded panel therefore sits below full health ratio until it is
/// repaired, which is what gates the passive self-cleaning sweep.
pub const DUSTY_MAX_HEALTH_FACTOR: f64 = 2.0;

const DEFAULT_SOLAR_MULTIPLIER: f64 = 1.0;

#[derive(Clone, Debug)]
struct Prototype {
    kind: EntityKind,
    max_health: f64,
}

#[derive(Clone, Debug)]
struct Surface {
    name: String,
    solar_multiplier: f64,
    blocked: HashSet<(i64, i64)>,
}

#[derive(Clone, Debug)]
struct Entity {
    surface: SurfaceId,
    name: String,
    position: Position,
    force: ForceId,
    quality: Quality,
    health: f64,
}

/// Placeholder left behind when a dusty panel is lost outside the storm engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Ghost {
    /// Surface the panel stood on.
    pub surface: SurfaceId,
    /// Base prototype name a rebuild system should construct.
    pub name: String,
    /// Position the panel occupied.
    pub position: Position,
    /// Force that owned the panel.
    pub force: ForceId,
    /// Quality tier of the lost panel.
    pub quality: Quality,
}

/// Represents the authoritative host state.
#[derive(Debug, Default)]
pub struct World {
    surfaces: BTreeMap<SurfaceId, Surface>,
    prototypes: HashMap<String, Prototype>,
    entities: BTreeMap<PanelId, Entity>,
    ghosts: Vec<Ghost>,
    notifications: Vec<Event>,
    next_surface: u32,
    next_entity: u64,
}

impl World {
    /// Creates an empty world without surfaces or prototypes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a solar panel prototype together with its derived dusty variant.
    pub fn register_panel_prototype(&mut self, base: &str, max_health: f64) {
        self.register_prototype(base, EntityKind::SolarPanel, max_health);
        self.register_prototype(
            &dusty_name(base),
            EntityKind::SolarPanel,
            max_health * DUSTY_MAX_HEALTH_FACTOR,
        );
    }

    /// Registers an arbitrary prototype under the provided name.
    pub fn register_prototype(&mut self, name: &str, kind: EntityKind, max_health: f64) {
        let _ = self
            .prototypes
            .insert(name.to_owned(), Prototype { kind, max_health });
    }

    /// Adds a surface with the provided baseline solar multiplier.
    pub fn add_surface(&mut self, name: &str, solar_multiplier: f64) -> SurfaceId {
        let id = SurfaceId::new(self.next_surface);
        self.next_surface = self.next_surface.saturating_add(1);
        let _ = self.surfaces.insert(
            id,
            Surface {
                name: name.to_owned(),
                solar_multiplier,
                blocked: HashSet::new(),
            },
        );
        id
    }

    /// Adds a surface using the default solar multiplier of one.
    pub fn add_default_surface(&mut self, name: &str) -> SurfaceId {
        self.add_surface(name, DEFAULT_SOLAR_MULTIPLIER)
    }

    /// Deletes a surface together with every entity standing on it.
    pub fn delete_surface(&mut self, surface: SurfaceId) -> bool {
        if self.surfaces.remove(&surface).is_none() {
            return false;
        }
        self.entities.retain(|_, entity| entity.surface != surface);
        true
    }

    /// Marks a tile as unable to host new entities.
    pub fn block_tile(&mut self, surface: SurfaceId, x: i64, y: i64) {
        if let Some(state) = self.surfaces.get_mut(&surface) {
            let _ = state.blocked.insert((x, y));
        }
    }

    /// Clears a previously blocked tile.
    pub fn unblock_tile(&mut self, surface: SurfaceId, x: i64, y: i64) {
        if let Some(state) = self.surfaces.get_mut(&surface) {
            let _ = state.blocked.remove(&(x, y));
        }
    }

    /// Raises an entity's health by `amount`, clamped to the prototype maximum.
    pub fn repair(&mut self, panel: PanelId, amount: f64) -> bool {
        let Some(entity) = self.entities.get_mut(&panel) else {
            return false;
        };
        let max_health = self
            .prototypes
            .get(&entity.name)
            .map_or(0.0, |prototype| prototype.max_health);
        entity.health = (entity.health + amount).clamp(0.0, max_health);
        true
    }

    /// Repairs every entity on the surface to full health.
    pub fn repair_all(&mut self, surface: SurfaceId) {
        let ids: Vec<PanelId> = self
            .entities
            .iter()
            .filter(|(_, entity)| entity.surface == surface)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let _ = self.repair(id, f64::INFINITY);
        }
    }

    /// Removes an entity through a non-degradation path such as deconstruction.
    ///
    /// Other host systems are notified; losing a dusty panel this way leaves a
    /// ghost and requests reconstruction of its base variant.
    pub fn remove_panel(&mut self, panel: PanelId) -> bool {
        self.destroy_panel(panel, true)
    }

    /// Moves pending host notifications into `out`.
    pub fn drain_events(&mut self, out: &mut Vec<Event>) {
        out.append(&mut self.notifications);
    }

    fn max_health(&self, name: &str) -> Option<f64> {
        self.prototypes.get(name).map(|prototype| prototype.max_health)
    }

    fn snapshot(&self, id: PanelId, entity: &Entity) -> Option<PanelSnapshot> {
        let prototype = self.prototypes.get(&entity.name)?;
        Some(PanelSnapshot {
            id,
            surface: entity.surface,
            name: entity.name.clone(),
            kind: prototype.kind,
            position: entity.position,
            force: entity.force,
            quality: entity.quality,
            health: entity.health,
            max_health: prototype.max_health,
        })
    }

    fn leave_ghost(&mut self, entity: &Entity) {
        let base = base_name(&entity.name).to_owned();
        self.ghosts.push(Ghost {
            surface: entity.surface,
            name: base.clone(),
            position: entity.position,
            force: entity.force,
            quality: entity.quality,
        });
        self.notifications.push(Event::ReconstructionRequested {
            surface: entity.surface,
            base_name: base,
            position: entity.position,
            force: entity.force,
            quality: entity.quality,
        });
    }
}

impl Host for World {
    fn surfaces(&self) -> Vec<SurfaceId> {
        self.surfaces.keys().copied().collect()
    }

    fn surface_exists(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface)
    }

    fn panels(&self, surface: SurfaceId) -> Vec<PanelSnapshot> {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.surface == surface)
            .filter_map(|(id, entity)| self.snapshot(*id, entity))
            .filter(PanelSnapshot::is_managed)
            .collect()
    }

    fn panel(&self, panel: PanelId) -> Option<PanelSnapshot> {
        let entity = self.entities.get(&panel)?;
        self.snapshot(panel, entity)
    }

    fn destroy_panel(&mut self, panel: PanelId, notify: bool) -> bool {
        let Some(entity) = self.entities.remove(&panel) else {
            return false;
        };
        let managed = self
            .prototypes
            .get(&entity.name)
            .is_some_and(|prototype| prototype.kind == EntityKind::SolarPanel);
        if notify && managed && is_dusty(&entity.name) {
            self.leave_ghost(&entity);
        }
        true
    }

    fn create_panel(&mut self, spec: PanelSpec) -> Result<PanelId, HostError> {
        let Some(surface) = self.surfaces.get(&spec.surface) else {
            return Err(HostError::MissingSurface(spec.surface));
        };
        let tile = (
            spec.position.x.floor() as i64,
            spec.position.y.floor() as i64,
        );
        if surface.blocked.contains(&tile) {
            return Err(HostError::PlacementBlocked {
                x: tile.0,
                y: tile.1,
            });
        }
        let Some(max_health) = self.max_health(&spec.name) else {
            return Err(HostError::UnknownPrototype(spec.name));
        };

        let id = PanelId::new(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        let _ = self.entities.insert(
            id,
            Entity {
                surface: spec.surface,
                name: spec.name,
                position: spec.position,
                force: spec.force,
                quality: spec.quality,
                health: spec.health.clamp(0.0, max_health),
            },
        );
        Ok(id)
    }

    fn solar_multiplier(&self, surface: SurfaceId) -> Option<f64> {
        self.surfaces
            .get(&surface)
            .map(|state| state.solar_multiplier)
    }

    fn set_solar_multiplier(&mut self, surface: SurfaceId, value: f64) {
        if let Some(state) = self.surfaces.get_mut(&surface) {
            state.solar_multiplier = value;
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use dust_storm_core::{Host, SurfaceId};

    use super::{Ghost, World};

    /// Retrieves the display name of a surface.
    #[must_use]
    pub fn surface_name(world: &World, surface: SurfaceId) -> Option<&str> {
        world
            .surfaces
            .get(&surface)
            .map(|state| state.name.as_str())
    }

    /// Looks up a surface by display name.
    #[must_use]
    pub fn surface_by_name(world: &World, name: &str) -> Option<SurfaceId> {
        world
            .surfaces
            .iter()
            .find(|(_, state)| state.name == name)
            .map(|(id, _)| *id)
    }

    /// Counts clean and dusty panels on a surface.
    #[must_use]
    pub fn panel_counts(world: &World, surface: SurfaceId) -> PanelCounts {
        let mut counts = PanelCounts::default();
        for panel in world.panels(surface) {
            if panel.is_dusty() {
                counts.dusty += 1;
            } else {
                counts.clean += 1;
            }
        }
        counts
    }

    /// Provides read-only access to the ghosts awaiting reconstruction.
    #[must_use]
    pub fn ghosts(world: &World) -> &[Ghost] {
        &world.ghosts
    }

    /// Number of clean and dusty panels standing on a surface.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PanelCounts {
        /// Panels in the base variant.
        pub clean: usize,
        /// Panels in the dusty variant.
        pub dusty: usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_spec(surface: SurfaceId, name: &str, x: f64, y: f64) -> PanelSpec {
        PanelSpec {
            surface,
            name: name.to_owned(),
            position: Position::new(x, y),
            force: ForceId::new(1),
            quality: Quality::Rare,
            health: f64::INFINITY,
        }
    }

    fn seeded_world() -> (World, SurfaceId) {
        let mut world = World::new();
        world.register_panel_prototype("solar-panel", 200.0);
        world.register_prototype("accumulator", EntityKind::Other, 150.0);
        let surface = world.add_default_surface("nauvis");
        (world, surface)
    }

    #[test]
    fn dusty_prototype_is_derived_with_scaled_health() {
        let (mut world, surface) = seeded_world();
        let id = world
            .create_panel(panel_spec(surface, "solar-panel-dusty", 0.5, 0.5))
            .expect("dusty prototype registered");
        let panel = world.panel(id).expect("panel exists");
        assert_eq!(panel.max_health, 400.0);
        assert_eq!(panel.health, 400.0);
        assert!(panel.is_dusty());
    }

    #[test]
    fn panels_only_lists_managed_entities() {
        let (mut world, surface) = seeded_world();
        let _ = world
            .create_panel(panel_spec(surface, "solar-panel", 0.0, 0.0))
            .expect("panel");
        let _ = world
            .create_panel(panel_spec(surface, "accumulator", 2.0, 0.0))
            .expect("accumulator");

        let panels = world.panels(surface);
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].name, "solar-panel");
    }

    #[test]
    fn blocked_tiles_reject_creation() {
        let (mut world, surface) = seeded_world();
        world.block_tile(surface, 3, 4);
        let result = world.create_panel(panel_spec(surface, "solar-panel", 3.5, 4.5));
        assert_eq!(result, Err(HostError::PlacementBlocked { x: 3, y: 4 }));

        world.unblock_tile(surface, 3, 4);
        assert!(world
            .create_panel(panel_spec(surface, "solar-panel", 3.5, 4.5))
            .is_ok());
    }

    #[test]
    fn unknown_prototype_and_surface_are_distinct_failures() {
        let (mut world, surface) = seeded_world();
        assert_eq!(
            world.create_panel(panel_spec(surface, "wind-turbine", 0.0, 0.0)),
            Err(HostError::UnknownPrototype("wind-turbine".to_owned()))
        );
        let missing = SurfaceId::new(99);
        assert_eq!(
            world.create_panel(panel_spec(missing, "solar-panel", 0.0, 0.0)),
            Err(HostError::MissingSurface(missing))
        );
    }

    #[test]
    fn removing_dusty_panel_requests_reconstruction() {
        let (mut world, surface) = seeded_world();
        let id = world
            .create_panel(panel_spec(surface, "solar-panel-dusty", 1.0, 2.0))
            .expect("panel");

        assert!(world.remove_panel(id));
        assert!(world.panel(id).is_none());

        let ghosts = query::ghosts(&world);
        assert_eq!(ghosts.len(), 1);
        assert_eq!(ghosts[0].name, "solar-panel");
        assert_eq!(ghosts[0].quality, Quality::Rare);

        let mut events = Vec::new();
        world.drain_events(&mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::ReconstructionRequested { base_name, .. }] if base_name == "solar-panel"
        ));
    }

    #[test]
    fn silent_destroy_leaves_no_ghost() {
        let (mut world, surface) = seeded_world();
        let dusty = world
            .create_panel(panel_spec(surface, "solar-panel-dusty", 1.0, 2.0))
            .expect("panel");
        let clean = world
            .create_panel(panel_spec(surface, "solar-panel", 3.0, 2.0))
            .expect("panel");

        assert!(world.destroy_panel(dusty, false));
        assert!(world.remove_panel(clean));
        assert!(!world.remove_panel(clean));
        assert!(query::ghosts(&world).is_empty());
    }

    #[test]
    fn repair_clamps_to_prototype_maximum() {
        let (mut world, surface) = seeded_world();
        let mut spec = panel_spec(surface, "solar-panel", 0.0, 0.0);
        spec.health = 50.0;
        let id = world.create_panel(spec).expect("panel");

        assert!(world.repair(id, 25.0));
        assert_eq!(world.panel(id).map(|panel| panel.health), Some(75.0));

        world.repair_all(surface);
        assert_eq!(world.panel(id).map(|panel| panel.health), Some(200.0));
    }

    #[test]
    fn deleting_surface_drops_its_entities() {
        let (mut world, surface) = seeded_world();
        let id = world
            .create_panel(panel_spec(surface, "solar-panel", 0.0, 0.0))
            .expect("panel");

        assert!(world.delete_surface(surface));
        assert!(!world.surface_exists(surface));
        assert!(world.panel(id).is_none());
        assert_eq!(world.solar_multiplier(surface), None);
    }

    #[test]
    fn query_counts_variants() {
        let (mut world, surface) = seeded_world();
        for x in 0..3 {
            let _ = world
                .create_panel(panel_spec(surface, "solar-panel", f64::from(x), 0.0))
                .expect("panel");
        }
        let _ = world
            .create_panel(panel_spec(surface, "solar-panel-dusty", 5.0, 0.0))
            .expect("panel");

        assert_eq!(
            query::panel_counts(&world, surface),
            query::PanelCounts { clean: 3, dusty: 1 }
        );
        assert_eq!(query::surface_by_name(&world, "nauvis"), Some(surface));
        assert_eq!(query::surface_name(&world, surface), Some("nauvis"));
    }
}
