//! Stress-driven fracture.
//!
//! Every fracture step the yield curve is rebuilt from fleet statistics,
//! each floe's accumulated stress tensor is reduced to its principal
//! stresses, and floes whose stress point falls outside the curve (and
//! whose area clears the minimum) are candidates. A candidate is first
//! deformed against its deepest contact, then shattered into Voronoi
//! pieces that inherit the parent's kinematics and conserve its mass and
//! momentum. Pieces below the minimum area dissolve into the ocean.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::Constants;
use crate::domain::Domain;
use crate::error::Result;
use crate::floe::factory::{build_floe, FloeSettings};
use crate::floe::interactions::{COL_FX, COL_FY, COL_ID, COL_OVERLAP};
use crate::floe::{Floe, Status};
use crate::grid::{Grid, Ocean};
use crate::math::{fl, Scalar, Vec2};
use crate::poly::{clip, voronoi, PointLocation, Polygon};

/// Fracture criterion in principal-stress space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FractureCriteria<F> {
    /// Fracture disabled by criterion.
    None,
    /// Hibler's elliptical yield curve, rebuilt from fleet statistics each
    /// fracture step.
    Hibler {
        pstar: F,
        c: F,
        poly: Option<Polygon<F>>,
    },
    /// A fixed user-supplied yield region.
    Custom { poly: Polygon<F> },
}

impl<F: Scalar> FractureCriteria<F> {
    pub fn hibler(pstar: F, c: F) -> Self {
        FractureCriteria::Hibler {
            pstar,
            c,
            poly: None,
        }
    }

    /// Rebuild the criterion from the current fleet: mean floe height and
    /// the fleet's areal concentration of the domain (clamped to `[0,1]`).
    pub fn update(&mut self, floes: &[Floe<F>], domain: &Domain<F>) {
        if let FractureCriteria::Hibler { pstar, c, poly } = self {
            let real: Vec<&Floe<F>> = floes.iter().filter(|f| !f.is_ghost()).collect();
            if real.is_empty() {
                return;
            }
            let n = fl::<F>(real.len() as f64);
            let h_mean = real.iter().map(|f| f.height).sum::<F>() / n;
            let area_total = real.iter().map(|f| f.area).sum::<F>();
            let concentration = (area_total / (domain.width() * domain.height())).min(F::one());
            if let Ok(curve) = hibler_curve(h_mean, *pstar, *c, concentration) {
                *poly = Some(curve);
            }
        }
    }

    /// The active yield polygon, if any.
    pub fn yield_poly(&self) -> Option<&Polygon<F>> {
        match self {
            FractureCriteria::None => None,
            FractureCriteria::Hibler { poly, .. } => poly.as_ref(),
            FractureCriteria::Custom { poly } => Some(poly),
        }
    }
}

/// Hibler's yield curve: a 100-vertex polygon on the ellipse with
/// semi-major axis `a = p·√2/2` along `σ₁ = σ₂`, `b = a/2`, centered at
/// `(−p/2, −p/2)`, where `p = p*·h̄·exp(−c(1−Ā))`.
pub fn hibler_curve<F: Scalar>(
    mean_height: F,
    pstar: F,
    c: F,
    concentration: F,
) -> Result<Polygon<F>> {
    let p = pstar * mean_height * (-c * (F::one() - concentration)).exp();
    let a = p * fl::<F>(2.0).sqrt() / fl(2.0);
    let b = a / fl(2.0);
    let half_p = p / fl(2.0);
    let sqrt2 = fl::<F>(2.0).sqrt();
    let n = 100usize;
    let mut ring = Vec::with_capacity(n);
    for k in 0..n {
        let theta = fl::<F>(2.0 * std::f64::consts::PI) * fl(k as f64) / fl((n - 1) as f64);
        let x = a * theta.cos();
        let y = b * theta.sin();
        ring.push(Vec2::new(
            (x - y) / sqrt2 - half_p,
            (x + y) / sqrt2 - half_p,
        ));
    }
    Polygon::new(ring, Vec::new())
}

/// Fracture configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FractureSettings<F> {
    pub enabled: bool,
    pub criteria: FractureCriteria<F>,
    /// Fracture runs every this many timesteps.
    pub dt_steps: usize,
    /// Voronoi pieces per shattered floe.
    pub npieces: usize,
    pub deform_on: bool,
}

impl<F: Scalar> Default for FractureSettings<F> {
    fn default() -> Self {
        Self {
            enabled: false,
            criteria: FractureCriteria::hibler(fl(2.25e5), fl(20.0)),
            dt_steps: 75,
            npieces: 3,
            deform_on: true,
        }
    }
}

/// Real-floe indices whose principal stress lies outside the yield curve
/// and whose area clears the minimum.
pub fn fracture_candidates<F: Scalar>(
    floes: &[Floe<F>],
    n_real: usize,
    yield_poly: &Polygon<F>,
    min_floe_area: F,
) -> Vec<usize> {
    let mut out = Vec::new();
    for (i, f) in floes[..n_real].iter().enumerate() {
        if f.status != Status::Active || f.area <= min_floe_area {
            continue;
        }
        let (lo, hi) = f.stress_accum.eigvals_symmetric();
        if yield_poly.locate(Vec2::new(lo, hi)) == PointLocation::Outside {
            out.push(i);
        }
    }
    out
}

/// Run one fracture pass. Returns the number of floes shattered.
///
/// Deformation and splitting are geometric per-candidate work; the list
/// edit (appending children, marking parents) is serialized here on the
/// driver thread.
#[allow(clippy::too_many_arguments)]
pub fn fracture_pass<F: Scalar, R: Rng>(
    floes: &mut Vec<Floe<F>>,
    n_real: usize,
    settings: &mut FractureSettings<F>,
    floe_settings: &FloeSettings<F>,
    consts: &Constants<F>,
    domain: &Domain<F>,
    grid: &Grid<F>,
    ocean: &mut Ocean<F>,
    next_id: &mut u64,
    rng: &mut R,
) -> usize {
    if !settings.enabled {
        return 0;
    }
    settings.criteria.update(floes, domain);
    let Some(yield_poly) = settings.criteria.yield_poly().cloned() else {
        return 0;
    };
    let candidates =
        fracture_candidates(floes, n_real, &yield_poly, floe_settings.min_floe_area);
    if candidates.is_empty() {
        return 0;
    }
    log::debug!("fracturing {} floes", candidates.len());

    let mut children: Vec<Floe<F>> = Vec::new();
    let mut fractured = 0usize;
    for idx in candidates {
        if settings.deform_on {
            deform_against_deepest_contact(floes, n_real, idx, consts);
        }
        let parent = &floes[idx];
        let pieces = voronoi::tessellate(&parent.poly, settings.npieces, rng);
        if pieces.len() < 2 {
            continue;
        }
        for piece in pieces {
            let area = piece.area();
            if area <= F::zero() {
                continue;
            }
            if area < floe_settings.min_floe_area {
                dissolve(&piece, parent.height, consts, grid, ocean);
                continue;
            }
            match build_floe(piece, parent.height, consts, floe_settings, rng) {
                Ok(mut child) => {
                    child.u = parent.u;
                    child.v = parent.v;
                    child.xi = parent.xi;
                    child.alpha = parent.alpha;
                    child.p_dxdt = parent.p_dxdt;
                    child.p_dydt = parent.p_dydt;
                    child.p_dudt = parent.p_dudt;
                    child.p_dvdt = parent.p_dvdt;
                    child.p_dxidt = parent.p_dxidt;
                    child.p_dalphadt = parent.p_dalphadt;
                    child.strain = parent.strain;
                    child.parent_ids = parent.parent_ids.clone();
                    child.parent_ids.push(parent.id);
                    child.id = *next_id;
                    *next_id += 1;
                    children.push(child);
                }
                Err(e) => log::debug!("dropping degenerate fracture piece: {e}"),
            }
        }
        floes[idx].status = Status::Remove;
        fractured += 1;
    }
    floes.extend(children);
    fractured
}

/// Deform a floe against the partner of its largest-overlap interaction:
/// the partner's polygon, advanced half the overlap's inradius along the
/// contact force, is subtracted, and the largest remaining piece replaces
/// the floe when it keeps at least 90 % of the area. Momentum (m·u) and
/// spin (I·ξ) survive the shape change.
fn deform_against_deepest_contact<F: Scalar>(
    floes: &mut [Floe<F>],
    n_real: usize,
    idx: usize,
    consts: &Constants<F>,
) {
    // Largest-overlap row with a floe partner.
    let mut best: Option<(u64, Vec2<F>, F)> = None;
    for row in floes[idx].interactions.rows() {
        if row[COL_ID] < F::zero() {
            continue;
        }
        let overlap = row[COL_OVERLAP];
        if best.map_or(true, |(_, _, o)| overlap > o) {
            let id = row[COL_ID].to_u64().unwrap_or(0);
            best = Some((id, Vec2::new(row[COL_FX], row[COL_FY]), overlap));
        }
    }
    let Some((partner_id, force, _)) = best else {
        return;
    };
    let dir = force.normalize_or_zero();
    if dir == Vec2::zero() {
        return;
    }
    let Some(pj) = floes[..n_real].iter().position(|f| f.id == partner_id) else {
        return;
    };
    if pj == idx {
        return;
    }

    let regions = clip::intersect(&floes[idx].poly, &floes[pj].poly);
    let Some(overlap_poly) = regions
        .into_iter()
        .max_by(|a, b| {
            a.area()
                .partial_cmp(&b.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    else {
        return;
    };
    let depth = overlap_poly
        .signed_distance(overlap_poly.centroid())
        .abs();
    let shift = dir * (depth / fl(2.0));
    let deformer = floes[pj].poly.translated(shift);

    let pieces = clip::difference(&floes[idx].poly, &deformer);
    let Some(largest) = pieces.into_iter().max_by(|a, b| {
        a.area()
            .partial_cmp(&b.area())
            .unwrap_or(std::cmp::Ordering::Equal)
    }) else {
        return;
    };
    if largest.area() <= floes[idx].area * fl(0.9) {
        return;
    }

    let floe = &mut floes[idx];
    let m_old = floe.mass;
    let i_old = floe.moment;
    floe.set_geometry(largest.without_holes(), consts.rho_ice);
    if floe.mass > F::zero() {
        floe.u *= m_old / floe.mass;
        floe.v *= m_old / floe.mass;
    }
    if floe.moment > F::zero() {
        floe.xi *= i_old / floe.moment;
    }
}

/// Route a sub-minimum piece's mass into the ocean's dissolved matrix at
/// the grid cell nearest its centroid.
fn dissolve<F: Scalar>(
    piece: &Polygon<F>,
    height: F,
    consts: &Constants<F>,
    grid: &Grid<F>,
    ocean: &mut Ocean<F>,
) {
    let mass = piece.area() * height * consts.rho_ice;
    if let Some((i, j)) = grid.cell_of(piece.centroid()) {
        ocean.dissolved[grid.line_index(i, j)] += mass;
    }
}
