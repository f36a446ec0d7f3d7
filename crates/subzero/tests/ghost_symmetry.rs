//! Ghost replication and interaction folding across a periodic pair.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use subzero::collision::{self, ghosts, CollisionSettings};
use subzero::floe::factory::{build_floe, FloeSettings, SubFloePointGenerator};
use subzero::floe::interactions::{COL_FX, COL_FY, COL_OVERLAP, COL_PX};
use subzero::{BoundaryKind, Constants, Domain, Floe, Polygon, Vec2};

fn make_floe(x0: f64, y0: f64, x1: f64, y1: f64, id: u64) -> Floe<f64> {
    let poly = Polygon::rect(Vec2::new(x0, y0), Vec2::new(x1, y1)).unwrap();
    let settings = FloeSettings {
        min_floe_area: 0.0,
        subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 16 },
        ..FloeSettings::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut f = build_floe(poly, 1.0, &Constants::default(), &settings, &mut rng).unwrap();
    f.id = id;
    f
}

fn periodic_ew_domain() -> Domain<f64> {
    let c = BoundaryKind::Collision;
    let p = BoundaryKind::Periodic;
    Domain::new((c, 1e5), (c, 0.0), (p, 1e5), (p, 0.0), Vec::new()).unwrap()
}

#[test]
fn wrap_contact_is_symmetric_in_the_parent_frames() {
    let domain = periodic_ew_domain();
    let consts = Constants::default();
    // A pokes through the east wall; B sits just inside the west wall so
    // that A's ghost overlaps it (and vice versa through B's ghost).
    let a = make_floe(9.6e4, 4.0e4, 1.02e5, 5.0e4, 1);
    let b = make_floe(1.5e3, 4.2e4, 3.5e3, 4.8e4, 2);
    let mut floes = vec![a, b];
    let n_real = floes.len();

    let added = ghosts::add_ghosts(&mut floes, &domain);
    assert_eq!(added, 2, "one ghost per floe crossing its wall");
    assert_eq!(floes.len(), 4);
    assert_eq!(floes[0].ghosts.len(), 1, "exactly one ghost per crossed axis");
    assert_eq!(floes[1].ghosts.len(), 1);

    collision::collide(
        &mut floes,
        n_real,
        &domain,
        &consts,
        &CollisionSettings::default(),
        10.0,
    );

    // The same logical contact is seen once: each parent ends up with
    // exactly one row, ghosts keep none after folding.
    assert_eq!(floes[0].interactions.len(), 1, "parent A has the folded row");
    assert_eq!(floes[1].interactions.len(), 1, "parent B has the folded row");
    assert!(floes[2].interactions.is_empty(), "ghost tables folded away");
    assert!(floes[3].interactions.is_empty());

    let ra = floes[0].interactions.row(0).to_vec();
    let rb = floes[1].interactions.row(0).to_vec();
    // Mirrored forces, identical overlap.
    assert!((ra[COL_FX] + rb[COL_FX]).abs() < 1e-9);
    assert!((ra[COL_FY] + rb[COL_FY]).abs() < 1e-9);
    assert!((ra[COL_OVERLAP] - rb[COL_OVERLAP]).abs() < 1e-9);
    assert!(ra[COL_OVERLAP] > 0.0);
    // The application points sit one domain width apart: each parent sees
    // the contact in its own frame.
    let dx = ra[COL_PX] - rb[COL_PX];
    assert!(
        (dx.abs() - domain.width()).abs() < 1e-6,
        "contact points differ by the periodic extent, dx = {dx}"
    );

    // Totals are equal and opposite across the wrap.
    let fsum_x = floes[0].collision_force.x + floes[1].collision_force.x;
    let fsum_y = floes[0].collision_force.y + floes[1].collision_force.y;
    assert!(fsum_x.abs() < 1e-9 && fsum_y.abs() < 1e-9);
    assert!(
        floes[0].collision_force.x.abs() > 0.0,
        "the wrap contact produced a force"
    );
}

#[test]
fn ghost_count_is_one_per_crossed_axis() {
    let p = BoundaryKind::Periodic;
    // Both axes periodic; the floe crosses only the east wall.
    let domain = Domain::new((p, 1e5), (p, 0.0), (p, 1e5), (p, 0.0), Vec::new()).unwrap();
    let mut floes = vec![make_floe(9.6e4, 4.0e4, 1.02e5, 5.0e4, 1)];
    ghosts::add_ghosts(&mut floes, &domain);
    assert_eq!(floes.len(), 2, "only the crossed axis replicates");
    assert_eq!(floes[1].ghost_id, 1);
    assert_eq!(floes[1].id, 1);
}
