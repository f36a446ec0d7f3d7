//! The floe entity: a rigid polygonal ice plate with inertia.
//!
//! Floes live in one global list owned by the simulation. Ghost replicas
//! (periodic images) sit in the same list with `ghost_id > 0` and the same
//! `id` as their parent; they exist for one collision substep. Everything
//! a timestep accumulates (ocean/atmosphere forcing, contact rows, stress)
//! lives on the floe itself so the passes stay embarrassingly parallel.

pub mod factory;
pub mod interactions;

use serde::{Deserialize, Serialize};

use crate::math::{fl, Mat2, Scalar, Vec2};
use crate::poly::Polygon;
use self::interactions::{Interactions, COL_FX, COL_FY, COL_PX, COL_PY};

/// Lifecycle state of a floe within one timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Active,
    /// Dropped at the next compaction.
    Remove,
    /// Merged with its fuse partners at the next compaction.
    Fuse,
}

/// Bounded history of stress tensors with an O(1) running sum.
///
/// `push` subtracts the evicted tensor and adds the new one, so the mean
/// over the window is always one division away.
#[derive(Clone, Debug)]
pub struct StressHistory<F> {
    buf: Vec<Mat2<F>>,
    head: usize,
    len: usize,
    sum: Mat2<F>,
}

impl<F: Scalar> StressHistory<F> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![Mat2::zero(); capacity.max(1)],
            head: 0,
            len: 0,
            sum: Mat2::zero(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, m: Mat2<F>) {
        if self.len == self.buf.len() {
            self.sum -= self.buf[self.head];
        } else {
            self.len += 1;
        }
        self.buf[self.head] = m;
        self.sum += m;
        self.head = (self.head + 1) % self.buf.len();
    }

    /// Mean over the stored window; zero when empty.
    pub fn mean(&self) -> Mat2<F> {
        if self.len == 0 {
            Mat2::zero()
        } else {
            self.sum * (F::one() / fl(self.len as f64))
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.sum = Mat2::zero();
        for m in &mut self.buf {
            *m = Mat2::zero();
        }
    }
}

/// A rigid polygonal sea-ice floe.
#[derive(Clone, Debug)]
pub struct Floe<F: Scalar> {
    // Geometry.
    pub poly: Polygon<F>,
    pub centroid: Vec2<F>,
    pub area: F,
    pub rmax: F,

    // Mass properties.
    pub height: F,
    pub mass: F,
    pub moment: F,

    // Kinematics.
    pub u: F,
    pub v: F,
    pub xi: F,
    pub alpha: F,

    // Previous-step derivatives for the second-order step.
    pub p_dxdt: F,
    pub p_dydt: F,
    pub p_dudt: F,
    pub p_dvdt: F,
    pub p_dxidt: F,
    pub p_dalphadt: F,

    // Sub-floe integration points: offsets from the centroid.
    pub x_subfloe: Vec<F>,
    pub y_subfloe: Vec<F>,

    // Forces accumulated this step.
    pub fx_oa: F,
    pub fy_oa: F,
    pub trq_oa: F,
    /// Area-weighted mean ocean heat-flux factor under the floe.
    pub hflx_factor: F,
    pub collision_force: Vec2<F>,
    pub collision_trq: F,

    // Contact records.
    pub interactions: Interactions<F>,
    pub overarea: F,

    // Lifecycle.
    pub status: Status,
    /// Partner ids when `status == Fuse`.
    pub fuse_with: Vec<u64>,

    // Identity.
    pub id: u64,
    /// 0 for real floes, the ghost ordinal otherwise.
    pub ghost_id: u32,
    pub parent_ids: Vec<u64>,
    /// Indices of this floe's ghost replicas in the global list.
    pub ghosts: Vec<usize>,

    // Stress state.
    pub stress_accum: Mat2<F>,
    pub stress_history: StressHistory<F>,
    pub strain: Mat2<F>,
}

impl<F: Scalar> Floe<F> {
    pub fn is_ghost(&self) -> bool {
        self.ghost_id > 0
    }

    /// Rigid-body velocity of the material point at absolute position `p`.
    pub fn velocity_at(&self, p: Vec2<F>) -> Vec2<F> {
        Vec2::new(
            self.u - self.xi * (p.y - self.centroid.y),
            self.v + self.xi * (p.x - self.centroid.x),
        )
    }

    /// Replace the floe's geometry, keeping height and recomputing the
    /// derived mass properties.
    pub fn set_geometry(&mut self, poly: Polygon<F>, rho_ice: F) {
        self.centroid = poly.centroid();
        self.area = poly.area();
        self.rmax = poly.max_radius();
        self.mass = self.area * self.height * rho_ice;
        self.moment = poly.moment_of_inertia(rho_ice * self.height);
        self.poly = poly;
    }

    /// Deep copy translated by `trans`, marked as the `ordinal`-th ghost.
    pub fn make_ghost(&self, trans: Vec2<F>, ordinal: u32) -> Self {
        let mut g = self.clone();
        g.poly.translate(trans);
        g.centroid += trans;
        g.ghost_id = ordinal;
        g.ghosts = Vec::new();
        g.interactions.clear();
        g.collision_force = Vec2::zero();
        g.collision_trq = F::zero();
        g.overarea = F::zero();
        g.status = Status::Active;
        g.fuse_with = Vec::new();
        g
    }

    /// Reset the per-step accumulators (collision pass 1).
    pub fn reset_collision_state(&mut self) {
        self.collision_force = Vec2::zero();
        self.collision_trq = F::zero();
        self.overarea = F::zero();
        self.interactions.clear();
    }

    /// Instantaneous stress tensor from the current interaction rows:
    /// `σ = 1/(2Ah)·Σ (r⊗f + (r⊗f)ᵀ)` with `r` the contact arm.
    pub fn instantaneous_stress(&self) -> Mat2<F> {
        let mut sum = Mat2::zero();
        for row in self.interactions.rows() {
            let r = Vec2::new(
                row[COL_PX] - self.centroid.x,
                row[COL_PY] - self.centroid.y,
            );
            let f = Vec2::new(row[COL_FX], row[COL_FY]);
            let rf = Mat2::outer(r, f);
            sum += rf + rf.transpose();
        }
        sum * (F::one() / (fl::<F>(2.0) * self.area * self.height))
    }

    /// Strain-rate tensor from the boundary integral of the rigid-body
    /// velocity field: `∂u/∂x ≈ (1/A)·∮ u·n_x ds` per component.
    pub fn compute_strain(&mut self) {
        let mut dudx = F::zero();
        let mut dudy = F::zero();
        let mut dvdx = F::zero();
        let mut dvdy = F::zero();
        let half = fl::<F>(0.5);
        for w in self.poly.exterior().windows(2) {
            let mid = (w[0] + w[1]) * half;
            let vel = self.velocity_at(mid);
            let dx = w[1].x - w[0].x;
            let dy = w[1].y - w[0].y;
            // Outward normal of a CCW ring times edge length is (dy, -dx).
            dudx += vel.x * dy;
            dudy -= vel.x * dx;
            dvdx += vel.y * dy;
            dvdy -= vel.y * dx;
        }
        let inv_a = F::one() / self.area;
        let shear = (dudy + dvdx) * half * inv_a;
        self.strain = Mat2::new(dudx * inv_a, shear, shear, dvdy * inv_a);
    }
}
