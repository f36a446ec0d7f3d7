//! External interfaces: serde-serializable state captures.
//!
//! Consumers (output writers, plotting, diagnostics) read these; the
//! serialization format is theirs to choose. Records with `ghost_id > 0`
//! are periodic replicas and must be filtered out of conservation sums.

use serde::{Deserialize, Serialize};

use crate::collision::CollisionSettings;
use crate::constants::Constants;
use crate::domain::Domain;
use crate::floe::factory::FloeSettings;
use crate::floe::Floe;
use crate::fracture::FractureSettings;
use crate::math::{Mat2, Scalar, Vec2};
use crate::simulation::{Simulation, SimulationSettings};

/// One floe's persisted state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloeSnapshot<F> {
    pub id: u64,
    pub ghost_id: u32,
    pub parent_ids: Vec<u64>,
    pub centroid: Vec2<F>,
    /// Closed exterior ring.
    pub coords: Vec<Vec2<F>>,
    pub mass: F,
    pub moment: F,
    pub u: F,
    pub v: F,
    pub xi: F,
    pub area: F,
    pub height: F,
    pub stress_accum: Mat2<F>,
    pub strain: Mat2<F>,
}

impl<F: Scalar> FloeSnapshot<F> {
    pub fn of(floe: &Floe<F>) -> Self {
        Self {
            id: floe.id,
            ghost_id: floe.ghost_id,
            parent_ids: floe.parent_ids.clone(),
            centroid: floe.centroid,
            coords: floe.poly.exterior().to_vec(),
            mass: floe.mass,
            moment: floe.moment,
            u: floe.u,
            v: floe.v,
            xi: floe.xi,
            area: floe.area,
            height: floe.height,
            stress_accum: floe.stress_accum,
            strain: floe.strain,
        }
    }
}

/// The floe field at one timestep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloeFieldSnapshot<F> {
    pub step: usize,
    pub floes: Vec<FloeSnapshot<F>>,
}

impl<F: Scalar> FloeFieldSnapshot<F> {
    pub fn capture(sim: &Simulation<F>) -> Self {
        Self {
            step: sim.step_count(),
            floes: sim.floes.iter().map(FloeSnapshot::of).collect(),
        }
    }
}

/// Grid extents and resolution (the mutex-guarded accumulators are
/// runtime state, not configuration).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridConfig<F> {
    pub x0: F,
    pub xf: F,
    pub y0: F,
    pub yf: F,
    pub nx: usize,
    pub ny: usize,
}

/// The full configuration needed to reconstruct a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitialState<F> {
    pub grid: GridConfig<F>,
    pub domain: Domain<F>,
    pub constants: Constants<F>,
    pub collision: CollisionSettings<F>,
    pub fracture: FractureSettings<F>,
    pub floe_settings: FloeSettings<F>,
    pub settings: SimulationSettings<F>,
    pub floes: Vec<FloeSnapshot<F>>,
}

impl<F: Scalar> InitialState<F> {
    pub fn capture(sim: &Simulation<F>) -> Self {
        Self {
            grid: GridConfig {
                x0: sim.grid.xg[0],
                xf: sim.grid.xg[sim.grid.nx],
                y0: sim.grid.yg[0],
                yf: sim.grid.yg[sim.grid.ny],
                nx: sim.grid.nx,
                ny: sim.grid.ny,
            },
            domain: sim.domain.clone(),
            constants: sim.consts,
            collision: sim.collision,
            fracture: sim.fracture.clone(),
            floe_settings: sim.floe_settings,
            settings: sim.settings,
            floes: sim
                .floes
                .iter()
                .filter(|f| !f.is_ghost())
                .map(FloeSnapshot::of)
                .collect(),
        }
    }
}
