#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Storm lifecycle engine.
//!
//! Each surface hosts at most one storm. A storm depresses the surface's solar
//! multiplier along a smootherstep ramp, holds it at `1 - intensity` while
//! steady, and ramps it back before expiring. On every scheduled tick it also
//! samples how many of its remaining eligible panels turn dusty, popping them
//! from a pre-sorted queue so the per-tick cost stays independent of the panel
//! count.

mod config;
mod controller;
mod queue;
mod ramp;
mod record;
mod registry;
mod scoring;

pub use config::StormConfig;
pub use controller::{StormController, StormRequest};
pub use queue::{PanelQueue, ReservePanels, ScoredPanel};
pub use ramp::ramp;
pub use record::{StormPhase, StormRecord, MIN_RAMP_DURATION};
pub use registry::{StormRegistry, DEFAULT_BASELINE};
pub use scoring::{normalize, NoiseParams};
