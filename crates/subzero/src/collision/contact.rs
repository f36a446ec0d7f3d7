//! Contact force between one overlap region and the two bodies forming it.
//!
//! The elastic normal force acts along the perpendicular of the chord
//! between the two boundary crossing points (or an edge-accumulated
//! direction when the region has more than two), with magnitude
//! `area · k`. Friction is a shear-spring displacement over the timestep,
//! Coulomb-capped.

use crate::constants::Constants;
use crate::math::{fl, Scalar, Vec2};
use crate::poly::{PointLocation, Polygon, BOUNDARY_EPS};

/// Rigid-body motion of one side of a contact (a floe, a wall, or static
/// topography).
#[derive(Clone, Copy, Debug)]
pub struct BodyMotion<F> {
    pub vel: Vec2<F>,
    pub xi: F,
    pub center: Vec2<F>,
}

impl<F: Scalar> BodyMotion<F> {
    pub fn fixed() -> Self {
        Self {
            vel: Vec2::zero(),
            xi: F::zero(),
            center: Vec2::zero(),
        }
    }

    pub fn moving(vel: Vec2<F>) -> Self {
        Self {
            vel,
            xi: F::zero(),
            center: Vec2::zero(),
        }
    }

    pub fn velocity_at(&self, p: Vec2<F>) -> Vec2<F> {
        Vec2::new(
            self.vel.x - self.xi * (p.y - self.center.y),
            self.vel.y + self.xi * (p.x - self.center.x),
        )
    }
}

/// One resolved contact: total force (normal + friction) applied at a
/// point, plus the overlap area that produced it.
#[derive(Clone, Copy, Debug)]
pub struct Contact<F> {
    pub force: Vec2<F>,
    pub point: Vec2<F>,
    pub overlap: F,
}

/// Spring constant between two floes (§ normal case), switching to the
/// stiffer large-floe form once either floe is continent-sized.
pub fn floe_floe_stiffness<F: Scalar>(consts: &Constants<F>, h1: F, a1: F, h2: F, a2: F) -> F {
    let large: F = fl(1e9);
    if a1 > large || a2 > large {
        consts.young * h1.min(h2) / a1.sqrt().min(a2.sqrt())
    } else {
        consts.young * h1 * h2 / (h1 * a2.sqrt() + h2 * a1.sqrt())
    }
}

/// Spring constant against a wall or topography.
pub fn floe_wall_stiffness<F: Scalar>(consts: &Constants<F>, h: F, a: F) -> F {
    consts.young * h / a.sqrt()
}

/// Resolve one overlap region into a contact force on body `i`.
///
/// `wall_normal` constrains the normal force onto a wall's axis (the
/// component parallel to the wall tangent is zeroed). Returns `None` for
/// degenerate regions where no force direction can be established.
pub fn resolve_region<F: Scalar>(
    poly_i: &Polygon<F>,
    poly_j: &Polygon<F>,
    region: &Polygon<F>,
    stiffness: F,
    motion_i: &BodyMotion<F>,
    motion_j: &BodyMotion<F>,
    consts: &Constants<F>,
    dt: F,
    wall_normal: Option<Vec2<F>>,
) -> Option<Contact<F>> {
    let area = region.area();
    if area <= F::zero() {
        return None;
    }
    let centroid = region.centroid();
    // On-boundary tolerance scaled to the coordinate magnitude, so the
    // crossing test survives single precision at domain scale.
    let scale = centroid.x.abs().max(centroid.y.abs()).max(F::one());
    let eps = fl::<F>(BOUNDARY_EPS).max(scale * F::epsilon() * fl(100.0));

    // Boundary crossing points are region vertices lying on both source
    // boundaries.
    let ring = region.exterior();
    let crossings: Vec<Vec2<F>> = ring[..ring.len() - 1]
        .iter()
        .copied()
        .filter(|&p| {
            poly_i.distance_to_boundary(p) <= eps && poly_j.distance_to_boundary(p) <= eps
        })
        .collect();

    let probe = area.sqrt() * fl(0.25);
    let (mut normal, chord_len) = if crossings.len() == 2 {
        let chord = crossings[1] - crossings[0];
        let mut n = chord.perp().normalize_or_zero();
        if n == Vec2::zero() {
            return None;
        }
        // Sign: a small push must move body i out of body j.
        let fwd = poly_j.signed_distance(centroid + n * probe);
        let bwd = poly_j.signed_distance(centroid - n * probe);
        if bwd > fwd {
            n = -n;
        }
        (n, chord.length())
    } else {
        // Accumulate over region edges carried by floe i's boundary, each
        // signed so a step off the edge leaves the overlap region.
        let mut acc = Vec2::zero();
        for w in ring.windows(2) {
            let mid = (w[0] + w[1]) * fl(0.5);
            if poly_i.signed_distance(mid).abs() >= eps {
                continue;
            }
            let d = w[1] - w[0];
            let mut n_edge = Vec2::new(d.y, -d.x);
            let step = n_edge.normalize_or_zero() * probe;
            if region.locate(mid + step) == PointLocation::Inside {
                n_edge = -n_edge;
            }
            acc += n_edge;
        }
        let n = acc.normalize_or_zero();
        if n == Vec2::zero() {
            return None;
        }
        (n, area.sqrt())
    };

    if let Some(axis) = wall_normal {
        let along = normal.dot(axis);
        if along.abs() <= F::epsilon() {
            normal = axis;
        } else {
            normal = axis * along.signum();
        }
    }

    let normal_force = normal * (area * stiffness);

    // Shear-spring friction at the application point, Coulomb-capped.
    let dv = motion_i.velocity_at(centroid) - motion_j.velocity_at(centroid);
    let speed = dv.length();
    let friction = if speed > F::epsilon() {
        let tangent = dv / speed;
        let raw = consts.shear_modulus() * chord_len * dt * speed;
        let cap = consts.mu * normal_force.length();
        -tangent * raw.min(cap)
    } else {
        Vec2::zero()
    };

    Some(Contact {
        force: normal_force + friction,
        point: centroid,
        overlap: area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::rect(Vec2::new(x0, y0), Vec2::new(x1, y1)).unwrap()
    }

    #[test]
    fn normal_force_pushes_bodies_apart() {
        // Two unit-ish squares overlapping in a vertical strip.
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(9.0, 0.5, 19.0, 9.5);
        let region = crate::poly::clip::intersect(&a, &b).remove(0);
        let consts = Constants::default();
        let c = resolve_region(
            &a,
            &b,
            &region,
            1.0,
            &BodyMotion::fixed(),
            &BodyMotion::fixed(),
            &consts,
            10.0,
            None,
        )
        .unwrap();
        // b sits to the east; a must be pushed west.
        assert!(c.force.x < 0.0, "force = {:?}", c.force);
        assert!(c.force.y.abs() < c.force.x.abs() * 1e-6);
        assert!((c.overlap - 9.0).abs() < 1e-9);
        // Magnitude is area * k for the static case (no friction).
        assert!((c.force.length() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn friction_opposes_sliding_and_is_capped() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(9.0, 0.5, 19.0, 9.5);
        let region = crate::poly::clip::intersect(&a, &b).remove(0);
        let consts = Constants::default();
        // Body a slides north along the contact.
        let mi = BodyMotion {
            vel: Vec2::new(0.0, 2.0),
            xi: 0.0,
            center: Vec2::new(5.0, 5.0),
        };
        let c = resolve_region(
            &a,
            &b,
            &region,
            1e3,
            &mi,
            &BodyMotion::fixed(),
            &consts,
            10.0,
            None,
        )
        .unwrap();
        // Normal magnitude is 9e3; the Coulomb cap binds here.
        let normal_mag = 9.0 * 1e3;
        let fy = c.force.y;
        assert!(fy < 0.0, "friction must oppose the northward slide");
        assert!(fy.abs() <= consts.mu * normal_mag * (1.0 + 1e-9));
    }

    #[test]
    fn wall_normal_constrains_direction() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        // Wall occupying y > 9.
        let wall = rect(-5.0, 9.0, 15.0, 20.0);
        let region = crate::poly::clip::intersect(&a, &wall).remove(0);
        let consts = Constants::default();
        let c = resolve_region(
            &a,
            &wall,
            &region,
            1.0,
            &BodyMotion::fixed(),
            &BodyMotion::fixed(),
            &consts,
            10.0,
            Some(Vec2::new(0.0, -1.0)),
        )
        .unwrap();
        assert!(c.force.x.abs() < 1e-9, "tangential component zeroed");
        assert!(c.force.y < 0.0, "wall pushes the floe south");
    }
}
