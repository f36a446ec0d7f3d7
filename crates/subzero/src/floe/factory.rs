//! Floe construction.
//!
//! Floes are built from polygons (holes split off first), raw coordinate
//! rings, or a Voronoi tiling of the whole domain for initial fields. The
//! factory also owns the sub-floe point strategies and the stress
//! calculator policies, both small tagged variants configured per
//! simulation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::Constants;
use crate::domain::Domain;
use crate::error::{Result, SubzeroError};
use crate::math::{fl, Mat2, Scalar, Vec2};
use crate::poly::{clip, voronoi, PointLocation, Polygon};

use super::{interactions::Interactions, Floe, Status, StressHistory};

/// Strategy for the sub-floe integration points.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum SubFloePointGenerator<F> {
    /// Uniform rejection sampling inside the polygon.
    MonteCarlo { npoints: usize },
    /// Lattice points at fixed spacing inside the polygon.
    SubGrid { spacing: F },
}

impl<F: Scalar> SubFloePointGenerator<F> {
    /// Offsets from the centroid used as quadrature points.
    pub fn generate<R: Rng>(
        &self,
        poly: &Polygon<F>,
        centroid: Vec2<F>,
        rng: &mut R,
    ) -> (Vec<F>, Vec<F>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        match *self {
            SubFloePointGenerator::MonteCarlo { npoints } => {
                let (lo, hi) = poly.bounding_box();
                let span = hi - lo;
                // Rejection sampling; the acceptance rate is bounded below
                // by the area fraction, so budget draws accordingly.
                let budget = npoints * 20 + 100;
                for _ in 0..budget {
                    if xs.len() == npoints {
                        break;
                    }
                    let p = Vec2::new(
                        lo.x + span.x * fl(rng.gen::<f64>()),
                        lo.y + span.y * fl(rng.gen::<f64>()),
                    );
                    if poly.locate(p) == PointLocation::Inside {
                        xs.push(p.x - centroid.x);
                        ys.push(p.y - centroid.y);
                    }
                }
            }
            SubFloePointGenerator::SubGrid { spacing } => {
                let (lo, hi) = poly.bounding_box();
                let half = fl::<F>(0.5);
                let mut y = lo.y + spacing * half;
                while y < hi.y {
                    let mut x = lo.x + spacing * half;
                    while x < hi.x {
                        let p = Vec2::new(x, y);
                        if poly.locate(p) == PointLocation::Inside {
                            xs.push(p.x - centroid.x);
                            ys.push(p.y - centroid.y);
                        }
                        x += spacing;
                    }
                    y += spacing;
                }
            }
        }
        if xs.is_empty() {
            // Always keep at least one quadrature point.
            xs.push(F::zero());
            ys.push(F::zero());
        }
        (xs, ys)
    }
}

/// Policy for folding instantaneous stress into the accumulated tensor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum StressCalculator<F> {
    /// Running mean over the bounded history window.
    Raw,
    /// Exponential moving average with weight `decay` on the new tensor.
    DecayAreaScaled { decay: F },
}

impl<F: Scalar> StressCalculator<F> {
    /// Fold one timestep's instantaneous stress into the floe.
    pub fn update(&self, floe: &mut Floe<F>) {
        let inst = floe.instantaneous_stress();
        floe.stress_history.push(inst);
        floe.stress_accum = match *self {
            StressCalculator::Raw => floe.stress_history.mean(),
            StressCalculator::DecayAreaScaled { decay } => {
                floe.stress_accum * (F::one() - decay) + inst * decay
            }
        };
    }
}

/// Per-floe configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FloeSettings<F> {
    /// Floes (and fracture pieces) below this area dissolve.
    pub min_floe_area: F,
    /// Hard cap on floe thickness.
    pub max_height: F,
    /// Capacity of the stress-history ring buffer.
    pub stress_history_len: usize,
    pub subfloe_points: SubFloePointGenerator<F>,
    pub stress_calculator: StressCalculator<F>,
}

impl<F: Scalar> Default for FloeSettings<F> {
    fn default() -> Self {
        Self {
            min_floe_area: fl(1e6),
            max_height: fl(10.0),
            stress_history_len: 1000,
            subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 1000 },
            stress_calculator: StressCalculator::Raw,
        }
    }
}

/// Build one floe from a hole-free polygon.
///
/// Height is capped at `settings.max_height`; a floe smaller than the
/// dissolution threshold is still built, with a warning, since the caller
/// may be assembling a test fixture.
pub fn build_floe<F: Scalar, R: Rng>(
    poly: Polygon<F>,
    height: F,
    consts: &Constants<F>,
    settings: &FloeSettings<F>,
    rng: &mut R,
) -> Result<Floe<F>> {
    if height <= F::zero() {
        return Err(SubzeroError::ArgumentOutOfRange {
            name: "floe height",
            value: height.to_f64().unwrap_or(f64::NAN),
        });
    }
    let height = height.min(settings.max_height);
    let poly = poly.without_holes();
    let area = poly.area();
    let centroid = poly.centroid();
    let rmax = poly.max_radius();
    if area < settings.min_floe_area {
        log::warn!(
            "floe area {area} below the minimum {}; it will dissolve on the next fracture pass",
            settings.min_floe_area
        );
    }
    let rho_h = consts.rho_ice * height;
    let (x_subfloe, y_subfloe) = settings.subfloe_points.generate(&poly, centroid, rng);
    Ok(Floe {
        mass: area * rho_h,
        moment: poly.moment_of_inertia(rho_h),
        poly,
        centroid,
        area,
        rmax,
        height,
        u: F::zero(),
        v: F::zero(),
        xi: F::zero(),
        alpha: F::zero(),
        p_dxdt: F::zero(),
        p_dydt: F::zero(),
        p_dudt: F::zero(),
        p_dvdt: F::zero(),
        p_dxidt: F::zero(),
        p_dalphadt: F::zero(),
        x_subfloe,
        y_subfloe,
        fx_oa: F::zero(),
        fy_oa: F::zero(),
        trq_oa: F::zero(),
        hflx_factor: F::zero(),
        collision_force: Vec2::zero(),
        collision_trq: F::zero(),
        interactions: Interactions::new(),
        overarea: F::zero(),
        status: Status::Active,
        fuse_with: Vec::new(),
        id: 0,
        ghost_id: 0,
        parent_ids: Vec::new(),
        ghosts: Vec::new(),
        stress_accum: Mat2::zero(),
        stress_history: StressHistory::new(settings.stress_history_len),
        strain: Mat2::zero(),
    })
}

/// Build floes from a polygon that may carry holes: the shape is cut
/// around each hole until only hole-free pieces remain, one floe per
/// piece.
pub fn floes_from_polygon<F: Scalar, R: Rng>(
    poly: Polygon<F>,
    height: F,
    consts: &Constants<F>,
    settings: &FloeSettings<F>,
    rng: &mut R,
) -> Result<Vec<Floe<F>>> {
    let mut queue = vec![poly];
    let mut pieces: Vec<Polygon<F>> = Vec::new();
    let mut rounds = 0usize;
    while let Some(p) = queue.pop() {
        rounds += 1;
        if rounds > 64 {
            log::warn!("giving up splitting a deeply holed polygon after 64 cuts");
            pieces.push(p.without_holes());
            continue;
        }
        if p.has_hole() {
            let (below, above) = p.split_around_first_hole();
            queue.extend(below);
            queue.extend(above);
        } else {
            pieces.push(p);
        }
    }
    pieces
        .into_iter()
        .map(|p| build_floe(p, height, consts, settings, rng))
        .collect()
}

/// Build floes from a raw coordinate ring.
pub fn floes_from_coords<F: Scalar, R: Rng>(
    coords: &[Vec2<F>],
    height: F,
    consts: &Constants<F>,
    settings: &FloeSettings<F>,
    rng: &mut R,
) -> Result<Vec<Floe<F>>> {
    let poly = Polygon::new(coords.to_vec(), Vec::new())?;
    floes_from_polygon(poly, height, consts, settings, rng)
}

/// Tile the domain (minus topography) with Voronoi-generated floes at the
/// given areal concentration.
///
/// Each Voronoi cell is shrunk about its centroid by `√concentration`, so
/// the generated field covers roughly `concentration` of the open water.
pub fn voronoi_field<F: Scalar, R: Rng>(
    domain: &Domain<F>,
    nfloes: usize,
    concentration: F,
    height: F,
    consts: &Constants<F>,
    settings: &FloeSettings<F>,
    rng: &mut R,
) -> Result<Vec<Floe<F>>> {
    if concentration <= F::zero() || concentration > F::one() {
        return Err(SubzeroError::ArgumentOutOfRange {
            name: "concentration",
            value: concentration.to_f64().unwrap_or(f64::NAN),
        });
    }
    let bounds = domain.bounds_poly()?;
    let cells = voronoi::tessellate(&bounds, nfloes, rng);
    let shrink = concentration.sqrt();
    let mut floes = Vec::new();
    for mut cell in cells {
        cell.scale(shrink);
        let mut open_pieces = vec![cell];
        for topo in &domain.topography {
            open_pieces = open_pieces
                .into_iter()
                .flat_map(|p| clip::difference(&p, &topo.poly))
                .collect();
        }
        for piece in open_pieces {
            if piece.area() >= settings.min_floe_area {
                floes.push(build_floe(piece, height, consts, settings, rng)?);
            }
        }
    }
    Ok(floes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Unit-height test floe with default constants and tiny quadrature.
    pub(crate) fn floe_from(poly: Polygon<f64>) -> Floe<f64> {
        let consts = Constants::default();
        let settings = FloeSettings {
            min_floe_area: 0.0,
            subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 16 },
            ..FloeSettings::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        build_floe(poly, 1.0, &consts, &settings, &mut rng).unwrap()
    }

    #[test]
    fn mass_follows_area_and_height() {
        let poly = Polygon::rect(Vec2::new(0.0, 0.0), Vec2::new(100.0, 50.0)).unwrap();
        let f = floe_from(poly);
        assert!((f.mass - 100.0 * 50.0 * 920.0).abs() < 1e-6);
        assert!(f.moment > 0.0);
        assert!(f.rmax > 0.0);
    }

    #[test]
    fn zero_height_rejected() {
        let consts = Constants::default();
        let settings = FloeSettings::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let poly = Polygon::rect(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)).unwrap();
        assert!(build_floe(poly, 0.0, &consts, &settings, &mut rng).is_err());
    }

    #[test]
    fn height_capped() {
        let poly = Polygon::<f64>::rect(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)).unwrap();
        let consts = Constants::default();
        let settings = FloeSettings {
            min_floe_area: 0.0,
            ..FloeSettings::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let f = build_floe(poly, 25.0, &consts, &settings, &mut rng).unwrap();
        assert!((f.height - 10.0).abs() < 1e-12);
    }

    #[test]
    fn holed_polygon_splits_into_hole_free_floes() {
        let poly = Polygon::new(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(20.0, 0.0),
                Vec2::new(20.0, 20.0),
                Vec2::new(0.0, 20.0),
            ],
            vec![vec![
                Vec2::new(8.0, 8.0),
                Vec2::new(12.0, 8.0),
                Vec2::new(12.0, 12.0),
                Vec2::new(8.0, 12.0),
            ]],
        )
        .unwrap();
        let consts = Constants::default();
        let settings = FloeSettings {
            min_floe_area: 0.0,
            subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 8 },
            ..FloeSettings::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let floes = floes_from_polygon(poly, 0.5, &consts, &settings, &mut rng).unwrap();
        assert!(floes.len() >= 2, "hole must split the floe");
        let total: f64 = floes.iter().map(|f| f.area).sum();
        assert!((total - 384.0).abs() < 1e-6, "total = {total}");
        for f in &floes {
            assert!(!f.poly.has_hole());
        }
    }

    #[test]
    fn voronoi_field_respects_concentration() {
        use crate::domain::BoundaryKind;
        let c = BoundaryKind::Collision;
        let domain =
            Domain::new((c, 1e5), (c, 0.0), (c, 1e5), (c, 0.0), Vec::new()).unwrap();
        let consts = Constants::default();
        let settings = FloeSettings {
            min_floe_area: 1e4,
            subfloe_points: SubFloePointGenerator::MonteCarlo { npoints: 8 },
            ..FloeSettings::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let floes =
            voronoi_field(&domain, 8, 0.6, 0.5, &consts, &settings, &mut rng).unwrap();
        assert!(floes.len() >= 4, "tiling produced {} floes", floes.len());
        let total: f64 = floes.iter().map(|f| f.area).sum();
        let domain_area = 1e10;
        assert!(
            total < domain_area * 0.75 && total > domain_area * 0.3,
            "coverage near the target concentration, got {}",
            total / domain_area
        );
        for f in &floes {
            assert!((f.height - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn subgrid_points_stay_inside() {
        let poly = Polygon::rect(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)).unwrap();
        let gen = SubFloePointGenerator::SubGrid { spacing: 2.0 };
        let c = poly.centroid();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (xs, ys) = gen.generate(&poly, c, &mut rng);
        assert_eq!(xs.len(), 25);
        for (x, y) in xs.iter().zip(ys.iter()) {
            let p = Vec2::new(c.x + x, c.y + y);
            assert_eq!(poly.locate(p), PointLocation::Inside);
        }
    }
}
