//! Multi-step loop invariants on an all-periodic domain.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use subzero::collision::CollisionSettings;
use subzero::floe::factory::{build_floe, FloeSettings, SubFloePointGenerator};
use subzero::floe::interactions::COL_OVERLAP;
use subzero::fracture::FractureSettings;
use subzero::{
    Atmos, BoundaryKind, Constants, Domain, Floe, Grid, Ocean, Polygon, Simulation,
    SimulationSettings, Vec2,
};

fn make_floe(x0: f64, y0: f64, x1: f64, y1: f64) -> Floe<f64> {
    let poly = Polygon::rect(Vec2::new(x0, y0), Vec2::new(x1, y1)).unwrap();
    let settings = FloeSettings {
        min_floe_area: 0.0,
        subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 16 },
        ..FloeSettings::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    build_floe(poly, 1.0, &Constants::default(), &settings, &mut rng).unwrap()
}

fn periodic_sim() -> Simulation<f64> {
    let p = BoundaryKind::Periodic;
    let domain = Domain::new((p, 1e5), (p, 0.0), (p, 1e5), (p, 0.0), Vec::new()).unwrap();
    let grid = Grid::from_counts(0.0, 1e5, 0.0, 1e5, 10, 10).unwrap();
    let ocean = Ocean::uniform(&grid, 0.3, 0.0, -1.0);
    let atmos = Atmos::uniform(&grid, 0.0, 0.0, -1.0);
    let floes = vec![
        // Straddles the east wall: exercises the ghost path every step.
        make_floe(9.7e4, 4.0e4, 1.03e5, 5.0e4),
        // A lightly overlapping pair that must push apart.
        make_floe(2.0e4, 2.0e4, 3.0e4, 3.0e4),
        make_floe(2.995e4, 2.1e4, 3.995e4, 2.9e4),
        // A loner.
        make_floe(6.0e4, 7.0e4, 7.0e4, 8.0e4),
    ];
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
            subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 16 },
            ..FloeSettings::default()
        },
        SimulationSettings {
            dt: 10.0,
            n_steps: 20,
            verbose: false,
            rng_seed: 3,
        },
    )
    .unwrap()
}

#[test]
fn invariants_hold_over_many_steps() {
    let mut sim = periodic_sim();
    for step in 0..20 {
        sim.step();
        assert_eq!(sim.floes.len(), 4, "no floe lost on a periodic domain");
        for f in &sim.floes {
            assert!(f.area > 0.0, "step {step}: area positive");
            assert!(f.rmax > 0.0, "step {step}: rmax positive");
            assert_eq!(
                f.poly.exterior().first(),
                f.poly.exterior().last(),
                "step {step}: ring closed"
            );
            assert!(f.ghost_id == 0, "only real floes between steps");
            assert!(
                f.centroid.x >= sim.domain.west.val && f.centroid.x <= sim.domain.east.val,
                "step {step}: centroid x in bounds ({})",
                f.centroid.x
            );
            assert!(
                f.centroid.y >= sim.domain.south.val && f.centroid.y <= sim.domain.north.val,
                "step {step}: centroid y in bounds ({})",
                f.centroid.y
            );
            for row in f.interactions.rows() {
                assert!(row[COL_OVERLAP] >= 0.0, "step {step}: overlap non-negative");
            }
        }
    }
    // The eastward current has set the fleet drifting east.
    let mean_u: f64 = sim.floes.iter().map(|f| f.u).sum::<f64>() / sim.floes.len() as f64;
    assert!(mean_u > 0.0, "mean drift follows the current, got {mean_u}");
}

#[test]
fn overlapping_pair_pushes_apart() {
    let mut sim = periodic_sim();
    let gap0 = sim.floes[2].centroid.x - sim.floes[1].centroid.x;
    for _ in 0..20 {
        sim.step();
    }
    let gap1 = sim.floes[2].centroid.x - sim.floes[1].centroid.x;
    assert!(
        gap1 > gap0,
        "contact forces separate the pair: {gap0} -> {gap1}"
    );
}
