//! Simulation driver.
//!
//! Owns the model state (grid, ocean, atmosphere, domain, floe list) and
//! the settings, and runs the timestep loop: clear ghosts → add ghosts →
//! coupling → collision → moving walls → integration → fracture (on its
//! own cadence) → compaction. Ghost bookkeeping and the floe-list edits
//! all happen here, on the driver thread; the parallel passes live in
//! their own modules.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::collision::{self, ghosts, CollisionSettings};
use crate::constants::Constants;
use crate::coupling;
use crate::domain::Domain;
use crate::error::Result;
use crate::floe::factory::FloeSettings;
use crate::floe::{Floe, Status};
use crate::fracture::{self, FractureSettings};
use crate::grid::{check_heat_budget, Atmos, Grid, Ocean};
use crate::integrator;
use crate::math::{fl, Scalar};
use crate::poly::clip;

/// Outer-loop configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimulationSettings<F> {
    /// Timestep (s).
    pub dt: F,
    /// Number of timesteps `run` executes.
    pub n_steps: usize,
    pub verbose: bool,
    /// Seed for the single RNG stream (Voronoi seeding, factory
    /// sampling, fracture splits).
    pub rng_seed: u64,
}

impl<F: Scalar> Default for SimulationSettings<F> {
    fn default() -> Self {
        Self {
            dt: fl(10.0),
            n_steps: 2000,
            verbose: false,
            rng_seed: 1,
        }
    }
}

/// The discrete-element sea-ice simulation.
pub struct Simulation<F: Scalar> {
    pub grid: Grid<F>,
    pub ocean: Ocean<F>,
    pub atmos: Atmos<F>,
    pub domain: Domain<F>,
    pub floes: Vec<Floe<F>>,
    pub consts: Constants<F>,
    pub collision: CollisionSettings<F>,
    pub fracture: FractureSettings<F>,
    pub floe_settings: FloeSettings<F>,
    pub settings: SimulationSettings<F>,
    rng: ChaCha8Rng,
    step_count: usize,
    max_id: u64,
}

impl<F: Scalar> Simulation<F> {
    /// Assemble a simulation. Floes without an id get sequential ones;
    /// the heat-flux factor is derived from the temperature fields, and
    /// suspicious heat budgets are logged.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grid: Grid<F>,
        mut ocean: Ocean<F>,
        atmos: Atmos<F>,
        domain: Domain<F>,
        mut floes: Vec<Floe<F>>,
        consts: Constants<F>,
        collision: CollisionSettings<F>,
        fracture: FractureSettings<F>,
        floe_settings: FloeSettings<F>,
        settings: SimulationSettings<F>,
    ) -> Result<Self> {
        check_heat_budget(&ocean, &atmos);
        ocean.compute_heat_flux(&atmos, &consts);
        let mut max_id = floes.iter().map(|f| f.id).max().unwrap_or(0);
        for f in &mut floes {
            if f.id == 0 {
                max_id += 1;
                f.id = max_id;
            }
        }
        let rng = ChaCha8Rng::seed_from_u64(settings.rng_seed);
        Ok(Self {
            grid,
            ocean,
            atmos,
            domain,
            floes,
            consts,
            collision,
            fracture,
            floe_settings,
            settings,
            rng,
            step_count: 0,
            max_id,
        })
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// The simulation's RNG stream, for factory calls that should share
    /// the seeded sequence.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Append floes, assigning fresh ids to any without one.
    pub fn add_floes(&mut self, floes: Vec<Floe<F>>) {
        for mut f in floes {
            if f.id == 0 {
                self.max_id += 1;
                f.id = self.max_id;
            } else {
                self.max_id = self.max_id.max(f.id);
            }
            self.floes.push(f);
        }
    }

    /// Advance the model by one timestep.
    pub fn step(&mut self) {
        let dt = self.settings.dt;

        // 1. Fresh slate: no ghosts, no per-cell accumulators.
        ghosts::clear_ghosts(&mut self.floes);
        self.grid.clear_accumulators();
        self.ocean.clear_si_frac();
        let n_real = self.floes.len();

        // 2. Periodic replicas.
        ghosts::add_ghosts(&mut self.floes, &self.domain);

        // 3. Ocean/atmosphere forcing.
        coupling::oa_forcing(
            &mut self.floes,
            n_real,
            &self.grid,
            &self.ocean,
            &self.atmos,
            &self.consts,
        );

        // 4. Contact forces, then the reverse stress fold and the floes'
        // stress/strain state for this step.
        collision::collide(
            &mut self.floes,
            n_real,
            &self.domain,
            &self.consts,
            &self.collision,
            dt,
        );
        coupling::fold_reverse_stress(&self.grid, &mut self.ocean);
        let calculator = self.floe_settings.stress_calculator;
        self.floes[..n_real].par_iter_mut().for_each(|f| {
            calculator.update(f);
            f.compute_strain();
        });

        // 5. Moving walls translate between collision and integration.
        self.domain.north.advance(dt);
        self.domain.south.advance(dt);
        self.domain.east.advance(dt);
        self.domain.west.advance(dt);

        // 6. Rigid-body update.
        integrator::step_floes(&mut self.floes, n_real, self.floe_settings.max_height, dt);

        // 7. Fracture on its own cadence.
        if self.fracture.enabled
            && self.fracture.dt_steps > 0
            && self.step_count % self.fracture.dt_steps == self.fracture.dt_steps - 1
        {
            let shattered = fracture::fracture_pass(
                &mut self.floes,
                n_real,
                &mut self.fracture,
                &self.floe_settings,
                &self.consts,
                &self.domain,
                &self.grid,
                &mut self.ocean,
                &mut self.max_id,
                &mut self.rng,
            );
            if shattered > 0 && self.settings.verbose {
                log::info!("step {}: fractured {shattered} floes", self.step_count);
            }
        }

        // 8. Compact the list.
        self.compact();

        self.step_count += 1;
        if self.settings.verbose && self.step_count % 50 == 0 {
            let area: F = self.floes.iter().map(|f| f.area).sum();
            log::info!(
                "step {} | {} floes | total ice area {area}",
                self.step_count,
                self.floes.len()
            );
        }
    }

    /// Run the configured number of timesteps.
    pub fn run(&mut self) {
        for _ in 0..self.settings.n_steps {
            self.step();
        }
    }

    /// Fuse marked pairs, drop removed floes and ghosts, wrap periodic
    /// centroids, and scrub interaction rows that reference vanished
    /// partners.
    fn compact(&mut self) {
        self.fuse_marked_pairs();

        self.floes.retain(|f| !f.is_ghost() && f.status != Status::Remove);

        for f in &mut self.floes {
            f.ghosts.clear();
            if f.status == Status::Fuse {
                // Partner vanished before the merge could happen.
                f.status = Status::Active;
                f.fuse_with.clear();
            }
            let t = self.domain.wrap_translation(f.centroid);
            if t != crate::math::Vec2::zero() {
                f.poly.translate(t);
                f.centroid += t;
            }
        }

        // Interaction rows must reference only surviving floes.
        let live: rustc_hash::FxHashSet<u64> = self.floes.iter().map(|f| f.id).collect();
        for f in &mut self.floes {
            f.interactions.retain_rows(|row| {
                let other = row[crate::floe::interactions::COL_ID];
                other < F::zero() || other.to_u64().map_or(false, |id| live.contains(&id))
            });
        }
    }

    fn fuse_marked_pairs(&mut self) {
        let mut pairs: Vec<(u64, u64)> = Vec::new();
        for f in &self.floes {
            if f.is_ghost() || f.status != Status::Fuse {
                continue;
            }
            for &other in &f.fuse_with {
                let key = if f.id < other { (f.id, other) } else { (other, f.id) };
                if !pairs.contains(&key) {
                    pairs.push(key);
                }
            }
        }
        for (a, b) in pairs {
            let Some(ia) = self.floes.iter().position(|f| !f.is_ghost() && f.id == a) else {
                continue;
            };
            let Some(ib) = self.floes.iter().position(|f| !f.is_ghost() && f.id == b) else {
                continue;
            };
            if ia == ib {
                continue;
            }
            self.fuse_pair(ia, ib);
        }
    }

    /// Merge two floes: union polygon, summed mass, momentum-conserving
    /// velocities. The larger floe keeps its identity, the smaller is
    /// removed. A union that does not produce a single piece aborts the
    /// merge.
    fn fuse_pair(&mut self, ia: usize, ib: usize) {
        let (keep, drop) = if self.floes[ia].area >= self.floes[ib].area {
            (ia, ib)
        } else {
            (ib, ia)
        };
        let mut merged = clip::union(&self.floes[keep].poly, &self.floes[drop].poly);
        if merged.len() != 1 {
            self.floes[ia].status = Status::Active;
            self.floes[ia].fuse_with.clear();
            self.floes[ib].status = Status::Active;
            self.floes[ib].fuse_with.clear();
            return;
        }
        let union_poly = merged.remove(0).without_holes();

        let (m1, u1, v1, i1, xi1) = {
            let f = &self.floes[keep];
            (f.mass, f.u, f.v, f.moment, f.xi)
        };
        let (m2, u2, v2, i2, xi2) = {
            let f = &self.floes[drop];
            (f.mass, f.u, f.v, f.moment, f.xi)
        };
        let mass = m1 + m2;

        let f = &mut self.floes[keep];
        f.height = mass / (self.consts.rho_ice * union_poly.area());
        f.set_geometry(union_poly, self.consts.rho_ice);
        f.u = (m1 * u1 + m2 * u2) / mass;
        f.v = (m1 * v1 + m2 * v2) / mass;
        f.xi = (i1 * xi1 + i2 * xi2) / (i1 + i2);
        f.status = Status::Active;
        f.fuse_with.clear();
        let (xs, ys) = self
            .floe_settings
            .subfloe_points
            .generate(&f.poly, f.centroid, &mut self.rng);
        f.x_subfloe = xs;
        f.y_subfloe = ys;

        self.floes[drop].status = Status::Remove;
        if self.settings.verbose {
            log::info!("fused floes {a} and {b}", a = self.floes[keep].id, b = self.floes[drop].id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BoundaryKind;
    use crate::floe::factory::tests::floe_from;
    use crate::math::Vec2;
    use crate::poly::Polygon;

    fn quiet_sim(domain: Domain<f64>, floes: Vec<Floe<f64>>) -> Simulation<f64> {
        let grid = Grid::from_counts(0.0, 1e5, 0.0, 1e5, 10, 10).unwrap();
        let ocean = Ocean::uniform(&grid, 0.0, 0.0, -1.0);
        let atmos = Atmos::uniform(&grid, 0.0, 0.0, -1.0);
        Simulation::new(
            grid,
            ocean,
            atmos,
            domain,
            floes,
            Constants::default(),
            CollisionSettings::default(),
            FractureSettings::default(),
            FloeSettings {
                min_floe_area: 0.0,
                subfloe_points: crate::floe::factory::SubFloePointGenerator::MonteCarlo {
                    npoints: 16,
                },
                ..FloeSettings::default()
            },
            SimulationSettings {
                dt: 10.0,
                n_steps: 10,
                verbose: false,
                rng_seed: 7,
            },
        )
        .unwrap()
    }

    fn closed_domain() -> Domain<f64> {
        let c = BoundaryKind::Collision;
        Domain::new((c, 1e5), (c, 0.0), (c, 1e5), (c, 0.0), Vec::new()).unwrap()
    }

    #[test]
    fn ids_assigned_sequentially() {
        let f1 = floe_from(Polygon::rect(Vec2::new(1e4, 1e4), Vec2::new(2e4, 2e4)).unwrap());
        let f2 = floe_from(Polygon::rect(Vec2::new(4e4, 4e4), Vec2::new(5e4, 5e4)).unwrap());
        let sim = quiet_sim(closed_domain(), vec![f1, f2]);
        assert_eq!(sim.floes[0].id, 1);
        assert_eq!(sim.floes[1].id, 2);
    }

    #[test]
    fn quiescent_step_leaves_floes_in_place() {
        let f = floe_from(Polygon::rect(Vec2::new(4e4, 4e4), Vec2::new(5e4, 5e4)).unwrap());
        let mut sim = quiet_sim(closed_domain(), vec![f]);
        let c0 = sim.floes[0].centroid;
        sim.step();
        assert_eq!(sim.floes.len(), 1);
        let c1 = sim.floes[0].centroid;
        assert!(c0.distance(c1) < 1.0, "still water moves nothing far");
        assert!(sim.domain.contains(c1));
    }

    #[test]
    fn drifting_floe_responds_to_current() {
        let mut sim = {
            let f = floe_from(Polygon::rect(Vec2::new(4e4, 4e4), Vec2::new(5e4, 5e4)).unwrap());
            quiet_sim(closed_domain(), vec![f])
        };
        sim.ocean = Ocean::uniform(&sim.grid, 0.3, 0.0, -1.0);
        for _ in 0..5 {
            sim.step();
        }
        assert!(sim.floes[0].u > 0.0, "eastward current accelerates the floe");
    }

    #[test]
    fn fusing_pair_merges_and_conserves_mass() {
        let fa = floe_from(Polygon::rect(Vec2::new(3.0e4, 3.0e4), Vec2::new(3.1e4, 3.1e4)).unwrap());
        let fb =
            floe_from(Polygon::rect(Vec2::new(3.005e4, 3.002e4), Vec2::new(3.105e4, 3.098e4)).unwrap());
        let mass_sum = fa.mass + fb.mass;
        let mut sim = quiet_sim(closed_domain(), vec![fa, fb]);
        sim.step();
        assert_eq!(sim.floes.len(), 1, "pair fused into one floe");
        let f = &sim.floes[0];
        assert!(
            (f.mass - mass_sum).abs() / mass_sum < 1e-9,
            "fusion conserves mass: {} vs {mass_sum}",
            f.mass
        );
        assert_eq!(f.status, Status::Active);
    }
}
