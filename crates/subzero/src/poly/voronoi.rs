//! Bounded Voronoi tessellation.
//!
//! Used to shatter a floe into pieces and to tile fresh floe fields. Cell
//! counts are tiny (a handful of seeds inside one floe's bounding box), so
//! each cell is cut directly from the box by the perpendicular-bisector
//! half-plane against every other seed; cells stay convex throughout, and
//! each cut is a single Sutherland–Hodgman pass.

use rand::Rng;

use crate::math::{fl, Scalar, Vec2};
use crate::poly::{PointLocation, Polygon};

/// Give up on seed sampling after this many rounds.
const MAX_SAMPLE_TRIES: usize = 10;

/// One convex cell per seed, clipped to the box `[lo, hi]`.
///
/// Degenerate cells (coincident seeds) are dropped, so the output can be
/// shorter than the input.
pub fn bounded_cells<F: Scalar>(
    seeds: &[Vec2<F>],
    lo: Vec2<F>,
    hi: Vec2<F>,
) -> Vec<Polygon<F>> {
    let mut cells = Vec::with_capacity(seeds.len());
    let half = fl::<F>(0.5);
    for (i, &s) in seeds.iter().enumerate() {
        let mut ring = vec![
            lo,
            Vec2::new(hi.x, lo.y),
            hi,
            Vec2::new(lo.x, hi.y),
        ];
        for (j, &t) in seeds.iter().enumerate() {
            if i == j {
                continue;
            }
            let n = t - s;
            if n.length_squared() <= F::epsilon() {
                continue;
            }
            let mid = (s + t) * half;
            ring = clip_half_plane(&ring, n, n.dot(mid));
            if ring.len() < 3 {
                break;
            }
        }
        if let Ok(cell) = Polygon::new(ring, Vec::new()) {
            cells.push(cell);
        }
    }
    cells
}

/// Keep the part of a convex ring with `n·p <= d` (Sutherland–Hodgman
/// against one half-plane).
fn clip_half_plane<F: Scalar>(ring: &[Vec2<F>], n: Vec2<F>, d: F) -> Vec<Vec2<F>> {
    let mut out = Vec::with_capacity(ring.len() + 1);
    let m = ring.len();
    for k in 0..m {
        let a = ring[k];
        let b = ring[(k + 1) % m];
        let da = n.dot(a) - d;
        let db = n.dot(b) - d;
        if da <= F::zero() {
            out.push(a);
        }
        if (da < F::zero()) != (db < F::zero()) && (db - da).abs() > F::epsilon() {
            let t = da / (da - db);
            out.push(a + (b - a) * t);
        }
    }
    out
}

/// Sample `count` seed points inside `poly`.
///
/// Draws are uniform over the bounding box with the target draw count
/// scaled by the inverse area fraction, repeated until enough interior
/// points accumulate or the try budget runs out. Falling short is a
/// convergence warning, not an error: the caller splits into fewer pieces.
pub fn sample_seeds<F: Scalar, R: Rng>(
    poly: &Polygon<F>,
    count: usize,
    rng: &mut R,
) -> Vec<Vec2<F>> {
    let (lo, hi) = poly.bounding_box();
    let span = hi - lo;
    let box_area = span.x * span.y;
    let area_fraction = (poly.area() / box_area).max(fl(1e-3));
    let per_round = ((fl::<F>(count as f64) / area_fraction).ceil())
        .to_usize()
        .unwrap_or(count)
        .max(count);

    let mut seeds: Vec<Vec2<F>> = Vec::with_capacity(count);
    for _ in 0..MAX_SAMPLE_TRIES {
        for _ in 0..per_round {
            let p = Vec2::new(
                lo.x + span.x * fl(rng.gen::<f64>()),
                lo.y + span.y * fl(rng.gen::<f64>()),
            );
            if poly.locate(p) == PointLocation::Inside {
                seeds.push(p);
                if seeds.len() == count {
                    return seeds;
                }
            }
        }
    }
    log::warn!(
        "voronoi seeding converged to {} of {} requested points",
        seeds.len(),
        count
    );
    seeds
}

/// Tessellate `poly` into up to `npieces` hole-free pieces.
///
/// Seeds are sampled inside the polygon, Voronoi cells are cut in the
/// polygon's bounding box, and each cell is intersected back with the
/// polygon. The pieces partition the polygon up to floating-point error.
pub fn tessellate<F: Scalar, R: Rng>(
    poly: &Polygon<F>,
    npieces: usize,
    rng: &mut R,
) -> Vec<Polygon<F>> {
    if npieces < 2 {
        return vec![poly.clone()];
    }
    let seeds = sample_seeds(poly, npieces, rng);
    if seeds.len() < 2 {
        return vec![poly.clone()];
    }
    let (lo, hi) = poly.bounding_box();
    let cells = bounded_cells(&seeds, lo, hi);
    let mut pieces = Vec::with_capacity(cells.len());
    for cell in &cells {
        for piece in super::clip::intersect(poly, cell) {
            pieces.push(piece.without_holes());
        }
    }
    if pieces.is_empty() {
        vec![poly.clone()]
    } else {
        pieces
    }
}
