//! Subzero - discrete-element sea-ice simulation
//!
//! Rigid polygonal floes drift under ocean and atmospheric stress,
//! collide elastically with Coulomb friction, wrap through periodic
//! boundaries via ghost replicas, and fracture into Voronoi pieces when
//! their accumulated stress leaves the yield curve. The core loop is:
//! - Coupling of each floe to the Eulerian ocean/atmosphere grid
//! - Pairwise collision detection and resolution (floes, walls, topography)
//! - Second-order rigid-body time integration
//! - Stress-driven fracturing with mass and momentum conservation
//!
//! This crate is simulation only: output serialization, plotting, and
//! input parsing are downstream consumers of the snapshot types in
//! [`snapshot`].
//!
//! All geometry and physics are generic over the scalar ([`math::Scalar`]):
//! `f64` for conservation studies, `f32` when memory traffic dominates.

pub mod collision;
pub mod constants;
pub mod coupling;
pub mod domain;
pub mod error;
pub mod floe;
pub mod fracture;
pub mod grid;
pub mod integrator;
pub mod math;
pub mod poly;
pub mod simulation;
pub mod snapshot;

pub use collision::CollisionSettings;
pub use constants::Constants;
pub use domain::{Boundary, BoundaryKind, Direction, Domain, TopographyElement};
pub use error::{Result, SubzeroError};
pub use floe::factory::{FloeSettings, StressCalculator, SubFloePointGenerator};
pub use floe::{Floe, Status, StressHistory};
pub use fracture::{FractureCriteria, FractureSettings};
pub use grid::{Atmos, Grid, Ocean};
pub use math::{Mat2, Scalar, Vec2};
pub use poly::{PointLocation, Polygon};
pub use simulation::{Simulation, SimulationSettings};
pub use snapshot::{FloeFieldSnapshot, FloeSnapshot, InitialState};
