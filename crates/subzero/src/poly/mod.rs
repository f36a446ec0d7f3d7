//! Polygon kernel.
//!
//! Floes, topography, boundary boxes and yield curves are all polygons:
//! closed rings (first vertex repeated last) with optional holes. The
//! kernel provides measures (area, centroid, moment of inertia, maximum
//! radius), rigid transforms, point queries, and the boolean operations the
//! collision and fracture engines are built on.
//!
//! Degenerate rings (fewer than 3 distinct points, or collapsed onto a
//! line) are rejected at construction. Runtime boolean operations never
//! fail: an empty intersection is an empty list.

pub mod clip;
pub mod voronoi;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubzeroError};
use crate::math::{fl, Scalar, Vec2};

/// Absolute tolerance for on-boundary tests and vertex deduplication.
pub(crate) const BOUNDARY_EPS: f64 = 1e-8;

/// Result of a point-in-polygon query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    OnBoundary,
    Outside,
}

/// Simple polygon with optional holes.
///
/// The exterior ring is counter-clockwise, holes are clockwise; both are
/// stored closed. Construction normalizes orientation and closure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon<F> {
    exterior: Vec<Vec2<F>>,
    holes: Vec<Vec<Vec2<F>>>,
}

impl<F: Scalar> Polygon<F> {
    /// Build a polygon from an outer ring and holes.
    ///
    /// Rings may be passed open or closed; adjacent duplicate vertices are
    /// dropped. Fails with `InvalidGeometry` if any ring has fewer than 3
    /// distinct vertices or zero area.
    pub fn new(exterior: Vec<Vec2<F>>, holes: Vec<Vec<Vec2<F>>>) -> Result<Self> {
        let exterior = normalize_ring(exterior, true)?;
        let holes = holes
            .into_iter()
            .map(|h| normalize_ring(h, false))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { exterior, holes })
    }

    /// Axis-aligned rectangle.
    pub fn rect(lo: Vec2<F>, hi: Vec2<F>) -> Result<Self> {
        Self::new(
            vec![
                lo,
                Vec2::new(hi.x, lo.y),
                hi,
                Vec2::new(lo.x, hi.y),
            ],
            Vec::new(),
        )
    }

    /// Closed exterior ring (first vertex == last).
    pub fn exterior(&self) -> &[Vec2<F>] {
        &self.exterior
    }

    /// Closed hole rings.
    pub fn holes(&self) -> &[Vec<Vec2<F>>] {
        &self.holes
    }

    pub fn has_hole(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Copy without holes.
    pub fn without_holes(&self) -> Self {
        Self {
            exterior: self.exterior.clone(),
            holes: Vec::new(),
        }
    }

    /// Number of distinct exterior vertices.
    pub fn num_vertices(&self) -> usize {
        self.exterior.len() - 1
    }

    /// Enclosed area (holes subtracted).
    pub fn area(&self) -> F {
        // Exterior is CCW (positive), holes CW (negative).
        let mut a = ring_signed_area(&self.exterior);
        for h in &self.holes {
            a += ring_signed_area(h);
        }
        a
    }

    /// Area-weighted centroid (holes subtracted).
    pub fn centroid(&self) -> Vec2<F> {
        let mut cx = F::zero();
        let mut cy = F::zero();
        let mut a2 = F::zero();
        let mut accum = |ring: &[Vec2<F>]| {
            for w in ring.windows(2) {
                let cross = w[0].perp_dot(w[1]);
                cx += (w[0].x + w[1].x) * cross;
                cy += (w[0].y + w[1].y) * cross;
                a2 += cross;
            }
        };
        accum(&self.exterior);
        for h in &self.holes {
            accum(h);
        }
        let six = fl::<F>(6.0);
        Vec2::new(cx / (six * a2 / fl(2.0)), cy / (six * a2 / fl(2.0)))
    }

    /// Polar moment of inertia about the centroid, with areal density
    /// `rho_h` (mass per unit area).
    ///
    /// Green's-theorem summation: `Izz = rho_h/12 · Σ wᵢ·((xᵢ²+xᵢxᵢ₊₁+xᵢ₊₁²)
    /// + (y²-terms))` over edges, vertices taken relative to the centroid.
    pub fn moment_of_inertia(&self, rho_h: F) -> F {
        let c = self.centroid();
        let twelve = fl::<F>(12.0);
        let mut sum = F::zero();
        let mut accum = |ring: &[Vec2<F>]| {
            for w in ring.windows(2) {
                let p = w[0] - c;
                let q = w[1] - c;
                let cross = p.perp_dot(q);
                sum += cross
                    * (p.x * p.x + p.x * q.x + q.x * q.x + p.y * p.y + p.y * q.y + q.y * q.y);
            }
        };
        accum(&self.exterior);
        for h in &self.holes {
            accum(h);
        }
        rho_h * sum / twelve
    }

    /// Maximum vertex distance from the centroid.
    pub fn max_radius(&self) -> F {
        let c = self.centroid();
        let mut r = F::zero();
        for p in &self.exterior {
            r = r.max(p.distance(c));
        }
        r
    }

    /// Axis-aligned bounding box `(lo, hi)`.
    pub fn bounding_box(&self) -> (Vec2<F>, Vec2<F>) {
        let mut lo = self.exterior[0];
        let mut hi = self.exterior[0];
        for p in &self.exterior {
            lo.x = lo.x.min(p.x);
            lo.y = lo.y.min(p.y);
            hi.x = hi.x.max(p.x);
            hi.y = hi.y.max(p.y);
        }
        (lo, hi)
    }

    /// Translate in place.
    pub fn translate(&mut self, d: Vec2<F>) {
        for p in &mut self.exterior {
            *p += d;
        }
        for h in &mut self.holes {
            for p in h {
                *p += d;
            }
        }
    }

    /// Translated copy.
    pub fn translated(&self, d: Vec2<F>) -> Self {
        let mut out = self.clone();
        out.translate(d);
        out
    }

    /// Rotate counter-clockwise about `origin`, in place.
    pub fn rotate_about(&mut self, origin: Vec2<F>, angle: F) {
        let (s, c) = (angle.sin(), angle.cos());
        let rot = |p: Vec2<F>| {
            let d = p - origin;
            origin + Vec2::new(c * d.x - s * d.y, s * d.x + c * d.y)
        };
        for p in &mut self.exterior {
            *p = rot(*p);
        }
        for h in &mut self.holes {
            for p in h {
                *p = rot(*p);
            }
        }
    }

    /// Scale about the centroid, in place.
    pub fn scale(&mut self, factor: F) {
        let c = self.centroid();
        for p in &mut self.exterior {
            *p = c + (*p - c) * factor;
        }
        for h in &mut self.holes {
            for p in h {
                *p = c + (*p - c) * factor;
            }
        }
    }

    /// Locate a point relative to the polygon, with an absolute
    /// on-boundary tolerance of [`BOUNDARY_EPS`].
    pub fn locate(&self, p: Vec2<F>) -> PointLocation {
        let eps = fl::<F>(BOUNDARY_EPS);
        if self.distance_to_boundary(p) <= eps {
            return PointLocation::OnBoundary;
        }
        if !ring_contains(&self.exterior, p) {
            return PointLocation::Outside;
        }
        for h in &self.holes {
            if ring_contains(h, p) {
                return PointLocation::Outside;
            }
        }
        PointLocation::Inside
    }

    /// Unsigned distance from `p` to the nearest boundary edge.
    pub fn distance_to_boundary(&self, p: Vec2<F>) -> F {
        let mut d = F::infinity();
        for w in self.exterior.windows(2) {
            d = d.min(point_segment_distance(p, w[0], w[1]));
        }
        for h in &self.holes {
            for w in h.windows(2) {
                d = d.min(point_segment_distance(p, w[0], w[1]));
            }
        }
        d
    }

    /// Signed distance from `p` to the boundary: negative inside.
    pub fn signed_distance(&self, p: Vec2<F>) -> F {
        let d = self.distance_to_boundary(p);
        match self.locate(p) {
            PointLocation::Outside => d,
            PointLocation::OnBoundary => F::zero(),
            PointLocation::Inside => -d,
        }
    }

    /// Interior angle at each distinct exterior vertex, in radians.
    ///
    /// Vertices are walked clockwise; the convex-angle test against the
    /// polygon edge decides whether a vertex is reflex, in which case the
    /// complement of the turn angle is reported.
    pub fn interior_angles(&self) -> Vec<F> {
        let mut ring: Vec<Vec2<F>> = self.exterior[..self.exterior.len() - 1].to_vec();
        // Orient clockwise so the cross-product sign of a convex corner
        // is fixed.
        ring.reverse();
        let n = ring.len();
        let two_pi = fl::<F>(2.0 * std::f64::consts::PI);
        let mut out = Vec::with_capacity(n);
        for k in 0..n {
            let prev = ring[(k + n - 1) % n];
            let here = ring[k];
            let next = ring[(k + 1) % n];
            let a = prev - here;
            let b = next - here;
            let angle = a.perp_dot(b).abs().atan2(a.dot(b));
            // Convexity: the edge midpoint chord must stay inside.
            let chord_mid = (prev + next) * fl(0.5);
            let convex = self.locate(chord_mid) != PointLocation::Outside;
            out.push(if convex { angle } else { two_pi - angle });
        }
        out.reverse();
        out
    }

    /// All proper crossing points between this boundary and another's.
    pub fn boundary_intersections(&self, other: &Self) -> Vec<Vec2<F>> {
        let mut pts: Vec<Vec2<F>> = Vec::new();
        let eps = fl::<F>(BOUNDARY_EPS);
        for a in self.exterior.windows(2) {
            for b in other.exterior.windows(2) {
                if let Some((_, _, p)) = seg_intersection(a[0], a[1], b[0], b[1]) {
                    if !pts.iter().any(|q| q.distance(p) <= eps) {
                        pts.push(p);
                    }
                }
            }
        }
        pts
    }

    /// Split along the horizontal line `y`, returning pieces below and
    /// above. Holes are ignored; callers split hole-free shells.
    pub fn split_at_y(&self, y: F) -> (Vec<Self>, Vec<Self>) {
        let (lo, hi) = self.bounding_box();
        let margin = (hi.x - lo.x + hi.y - lo.y) + F::one();
        let below = Polygon::rect(
            Vec2::new(lo.x - margin, lo.y - margin),
            Vec2::new(hi.x + margin, y),
        );
        let above = Polygon::rect(
            Vec2::new(lo.x - margin, y),
            Vec2::new(hi.x + margin, hi.y + margin),
        );
        let shell = self.without_holes();
        let below_pieces = match below {
            Ok(r) => clip::intersect(&shell, &r),
            Err(_) => Vec::new(),
        };
        let above_pieces = match above {
            Ok(r) => clip::intersect(&shell, &r),
            Err(_) => Vec::new(),
        };
        (below_pieces, above_pieces)
    }

    /// Cut horizontally through the centroid of the first hole, subtract
    /// all holes from the pieces, and return the hole-free pieces below
    /// and above the cut.
    ///
    /// Polygons without holes come back unchanged (below list).
    pub fn split_around_first_hole(&self) -> (Vec<Self>, Vec<Self>) {
        if self.holes.is_empty() {
            return (vec![self.clone()], Vec::new());
        }
        let hole = match Polygon::new(self.holes[0].clone(), Vec::new()) {
            Ok(h) => h,
            Err(_) => return (vec![self.without_holes()], Vec::new()),
        };
        let cut_y = hole.centroid().y;
        let (below, above) = self.split_at_y(cut_y);
        let subtract_holes = |pieces: Vec<Self>| -> Vec<Self> {
            let mut out = pieces;
            for hring in &self.holes {
                let hole_poly = match Polygon::new(hring.clone(), Vec::new()) {
                    Ok(h) => h,
                    Err(_) => continue,
                };
                out = out
                    .into_iter()
                    .flat_map(|piece| clip::difference(&piece, &hole_poly))
                    .collect();
            }
            out
        };
        (subtract_holes(below), subtract_holes(above))
    }

    /// A point strictly inside the polygon, when one can be found.
    ///
    /// The centroid works for all convex and most concave shapes; failing
    /// that, edge midpoints nudged inward are probed.
    pub(crate) fn representative_point(&self) -> Vec2<F> {
        let c = self.centroid();
        if self.locate(c) == PointLocation::Inside {
            return c;
        }
        let nudge = self.max_radius() * fl(1e-4);
        for w in self.exterior.windows(2) {
            let mid = (w[0] + w[1]) * fl(0.5);
            let inward = (w[1] - w[0]).perp().normalize_or_zero();
            let p = mid + inward * nudge;
            if self.locate(p) == PointLocation::Inside {
                return p;
            }
        }
        c
    }
}

/// Close, deduplicate and orient a ring. Exterior rings become CCW, holes
/// CW.
fn normalize_ring<F: Scalar>(mut ring: Vec<Vec2<F>>, exterior: bool) -> Result<Vec<Vec2<F>>> {
    let eps = fl::<F>(BOUNDARY_EPS);
    // Drop a pre-existing closing vertex, dedupe neighbors, then re-close.
    if ring.len() > 1 && ring[0].distance(ring[ring.len() - 1]) <= eps {
        ring.pop();
    }
    ring.dedup_by(|a, b| a.distance(*b) <= eps);
    if ring.len() > 1 && ring[0].distance(ring[ring.len() - 1]) <= eps {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(SubzeroError::InvalidGeometry {
            reason: format!("ring has {} distinct vertices, need at least 3", ring.len()),
        });
    }
    let first = ring[0];
    ring.push(first);
    let area = ring_signed_area(&ring);
    if area.abs() <= fl(BOUNDARY_EPS) {
        return Err(SubzeroError::InvalidGeometry {
            reason: "ring collapsed onto a line".to_string(),
        });
    }
    let want_ccw = exterior;
    if (area > F::zero()) != want_ccw {
        ring.reverse();
    }
    Ok(ring)
}

/// Shoelace signed area of a closed ring (CCW positive).
pub(crate) fn ring_signed_area<F: Scalar>(ring: &[Vec2<F>]) -> F {
    let mut a2 = F::zero();
    for w in ring.windows(2) {
        a2 += w[0].perp_dot(w[1]);
    }
    a2 / fl(2.0)
}

/// Ray-cast containment against a closed ring. Boundary points are not
/// handled specially; callers needing an on-boundary answer test distance
/// first.
pub(crate) fn ring_contains<F: Scalar>(ring: &[Vec2<F>], p: Vec2<F>) -> bool {
    let mut inside = false;
    for w in ring.windows(2) {
        let (a, b) = (w[0], w[1]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x_cross > p.x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Distance from a point to a segment.
pub(crate) fn point_segment_distance<F: Scalar>(p: Vec2<F>, a: Vec2<F>, b: Vec2<F>) -> F {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= F::epsilon() {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).max(F::zero()).min(F::one());
    p.distance(a + ab * t)
}

/// Proper crossing of two segments, with parameters along each.
///
/// Returns `None` for parallel or endpoint-touching configurations; those
/// are resolved by the containment fall-backs of the boolean ops.
pub(crate) fn seg_intersection<F: Scalar>(
    a0: Vec2<F>,
    a1: Vec2<F>,
    b0: Vec2<F>,
    b1: Vec2<F>,
) -> Option<(F, F, Vec2<F>)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.perp_dot(db);
    let scale = da.length() * db.length();
    if denom.abs() <= scale * fl(1e-12) {
        return None;
    }
    let diff = b0 - a0;
    let t = diff.perp_dot(db) / denom;
    let u = diff.perp_dot(da) / denom;
    let margin = fl::<F>(1e-12);
    if t > margin && t < F::one() - margin && u > margin && u < F::one() - margin {
        Some((t, u, a0 + da * t))
    } else {
        None
    }
}
