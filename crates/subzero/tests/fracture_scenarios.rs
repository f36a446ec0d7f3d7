//! Fracture scenario tests: Voronoi split conservation and deformation
//! against a colliding floe.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use subzero::collision::{self, CollisionSettings};
use subzero::floe::factory::{build_floe, FloeSettings, SubFloePointGenerator};
use subzero::fracture::{fracture_pass, FractureCriteria, FractureSettings};
use subzero::{
    BoundaryKind, Constants, Domain, Floe, Grid, Mat2, Ocean, Polygon, Status, Vec2,
};

fn test_floe_settings() -> FloeSettings<f64> {
    FloeSettings {
        min_floe_area: 1e4,
        subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 32 },
        ..FloeSettings::default()
    }
}

fn make_floe(x0: f64, y0: f64, w: f64, h: f64, height: f64, id: u64) -> Floe<f64> {
    let poly = Polygon::rect(Vec2::new(x0, y0), Vec2::new(x0 + w, y0 + h)).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut f = build_floe(
        poly,
        height,
        &Constants::default(),
        &test_floe_settings(),
        &mut rng,
    )
    .unwrap();
    f.id = id;
    f
}

fn closed_domain() -> Domain<f64> {
    let c = BoundaryKind::Collision;
    Domain::new((c, 2e5), (c, 0.0), (c, 2e5), (c, 0.0), Vec::new()).unwrap()
}

/// A yield region around the origin: zero stress stays inside, the
/// loaded floe's principal stresses fall outside.
fn origin_yield_criteria() -> FractureCriteria<f64> {
    let poly = Polygon::rect(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)).unwrap();
    FractureCriteria::Custom { poly }
}

#[test]
fn split_conserves_mass_area_and_kinematics() {
    let consts = Constants::default();
    let floe_settings = test_floe_settings();
    let mut parent = make_floe(1e4, 1e4, 8e3, 8e3, 0.5, 1);
    parent.u = 0.12;
    parent.v = -0.05;
    parent.xi = 8e-6;
    parent.p_dudt = 2e-7;
    parent.strain = Mat2::new(1e-8, 2e-9, 2e-9, -1e-8);
    parent.stress_accum = Mat2::new(-1e6, 0.0, 0.0, -1e6);
    let parent_mass = parent.mass;
    let parent_area = parent.area;
    let parent_poly = parent.poly.clone();

    let mut floes = vec![parent];
    let mut settings = FractureSettings {
        enabled: true,
        criteria: origin_yield_criteria(),
        dt_steps: 1,
        npieces: 3,
        deform_on: false,
    };
    let grid: Grid<f64> = Grid::from_counts(0.0, 2e5, 0.0, 2e5, 10, 10).unwrap();
    let mut ocean = Ocean::uniform(&grid, 0.0, 0.0, -1.0);
    let domain = closed_domain();
    let mut next_id = 2u64;
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let shattered = fracture_pass(
        &mut floes,
        1,
        &mut settings,
        &floe_settings,
        &consts,
        &domain,
        &grid,
        &mut ocean,
        &mut next_id,
        &mut rng,
    );

    assert_eq!(shattered, 1);
    assert_eq!(floes[0].status, Status::Remove, "parent consumed by fracture");
    let children: Vec<&Floe<f64>> = floes[1..].iter().collect();
    assert!(children.len() >= 2, "split produced {} pieces", children.len());

    // Mass conservation.
    let mass_sum: f64 = children.iter().map(|c| c.mass).sum();
    assert!(
        (mass_sum - parent_mass).abs() / parent_mass < 1e-6,
        "child masses {mass_sum} vs parent {parent_mass}"
    );

    // The pieces partition the parent: their union area equals the parent
    // area, and so does the sum of their intersections with the parent.
    let area_sum: f64 = children.iter().map(|c| c.area).sum();
    assert!(
        (area_sum - parent_area).abs() < 1e-6 * parent_area,
        "child areas {area_sum} vs parent {parent_area}"
    );
    let inter_sum: f64 = children
        .iter()
        .flat_map(|c| subzero::poly::clip::intersect(&c.poly, &parent_poly))
        .map(|p| p.area())
        .sum();
    assert!((inter_sum - parent_area).abs() < 1e-6 * parent_area);

    // Kinematics and lineage inherited.
    for c in &children {
        assert!((c.u - 0.12).abs() < 1e-12);
        assert!((c.v - -0.05).abs() < 1e-12);
        assert!((c.xi - 8e-6).abs() < 1e-18);
        assert!((c.p_dudt - 2e-7).abs() < 1e-18);
        assert!((c.strain.xx - 1e-8).abs() < 1e-20);
        assert_eq!(c.parent_ids, vec![1]);
        assert!((c.height - 0.5).abs() < 1e-12);
        assert!(c.id >= 2);
    }
    // Fresh sequential ids.
    let mut ids: Vec<u64> = children.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), children.len(), "ids are unique");
}

#[test]
fn deformation_shaves_the_contact_side() {
    let consts = Constants::default();
    let floe_settings = test_floe_settings();
    // Floe A [0,1000]^2 with a deformer overlapping its east edge by 50 m.
    let mut a = make_floe(0.0, 0.0, 1000.0, 1000.0, 1.0, 1);
    a.stress_accum = Mat2::new(-1e6, 0.0, 0.0, -1e6);
    let b = make_floe(950.0, -100.0, 1000.0, 1200.0, 1.0, 2);
    let a_area = a.area;
    let b_area = b.area;
    let mut floes = vec![a, b];

    // Fill the interaction tables.
    let domain = closed_domain();
    collision::collide(
        &mut floes,
        2,
        &domain,
        &consts,
        &CollisionSettings::default(),
        10.0,
    );
    assert!(
        floes[0].interactions.len() >= 1,
        "contact must register before fracture"
    );

    let mut settings = FractureSettings {
        enabled: true,
        criteria: origin_yield_criteria(),
        dt_steps: 1,
        npieces: 3,
        deform_on: true,
    };
    let grid: Grid<f64> = Grid::from_counts(0.0, 2e5, 0.0, 2e5, 10, 10).unwrap();
    let mut ocean = Ocean::uniform(&grid, 0.0, 0.0, -1.0);
    let mut next_id = 3u64;
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let shattered = fracture_pass(
        &mut floes,
        2,
        &mut settings,
        &floe_settings,
        &consts,
        &domain,
        &grid,
        &mut ocean,
        &mut next_id,
        &mut rng,
    );
    assert_eq!(shattered, 1, "only the loaded floe fractures");

    // The deformer floe is untouched.
    assert_eq!(floes[1].status, Status::Active);
    assert!((floes[1].area - b_area).abs() < 1e-9);

    // The overlap chord sits 50 m into A; the deformer advances half the
    // overlap inradius (12.5 m), so A keeps [0, 937.5] x [0, 1000].
    let deformed_area = 937.5 * 1000.0;
    let children_area: f64 = floes[2..].iter().map(|c| c.area).sum();
    assert!(
        (children_area - deformed_area).abs() < 1e-6 * deformed_area,
        "children cover the deformed floe: {children_area} vs {deformed_area}"
    );
    assert!(children_area < a_area, "deformation removed area");
}
