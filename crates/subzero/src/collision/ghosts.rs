//! Ghost floes for periodic boundaries.
//!
//! A real floe whose bounding disc crosses a periodic wall gets a deep
//! copy translated by the domain extent, appended to the same floe list
//! with `ghost_id > 0`. Ghosts last one timestep: they collide, their
//! interactions fold back into the parent, and compaction discards them.
//! When a parent has drifted fully outside the domain, the parent and its
//! ghost swap geometry so the real floe always keeps an in-domain
//! centroid.

use crate::domain::Domain;
use crate::floe::Floe;
use crate::math::{Scalar, Vec2};

/// Replicate real floes across every periodic axis pair. Returns the
/// number of ghosts appended.
pub fn add_ghosts<F: Scalar>(floes: &mut Vec<Floe<F>>, domain: &Domain<F>) -> usize {
    let n_real = floes.len();
    let mut added = 0;

    if domain.periodic_x() {
        let width = domain.width();
        for i in 0..n_real {
            let c = floes[i].centroid;
            let r = floes[i].rmax;
            let mut trans = Vec2::zero();
            if c.x - r < domain.west.val {
                trans = Vec2::new(width, F::zero());
            } else if c.x + r > domain.east.val {
                trans = Vec2::new(-width, F::zero());
            }
            if trans != Vec2::zero() {
                let out_of_domain = c.x < domain.west.val || c.x > domain.east.val;
                spawn_ghost(floes, i, trans, out_of_domain);
                added += 1;
            }
        }
    }

    if domain.periodic_y() {
        let height = domain.height();
        for i in 0..n_real {
            let c = floes[i].centroid;
            let r = floes[i].rmax;
            let mut trans = Vec2::zero();
            if c.y - r < domain.south.val {
                trans = Vec2::new(F::zero(), height);
            } else if c.y + r > domain.north.val {
                trans = Vec2::new(F::zero(), -height);
            }
            if trans != Vec2::zero() {
                let out_of_domain = c.y < domain.south.val || c.y > domain.north.val;
                spawn_ghost(floes, i, trans, out_of_domain);
                added += 1;
            }
        }
    }

    added
}

fn spawn_ghost<F: Scalar>(floes: &mut Vec<Floe<F>>, parent: usize, trans: Vec2<F>, swap: bool) {
    let ordinal = floes[parent].ghosts.len() as u32 + 1;
    let mut ghost = floes[parent].make_ghost(trans, ordinal);
    if swap {
        // The translated copy is the one inside the domain: it becomes the
        // real floe's geometry, the ghost takes the old position.
        std::mem::swap(&mut floes[parent].poly, &mut ghost.poly);
        std::mem::swap(&mut floes[parent].centroid, &mut ghost.centroid);
    }
    let idx = floes.len();
    floes[parent].ghosts.push(idx);
    floes.push(ghost);
}

/// Drop every ghost from the list and clear the parents' ghost indices.
pub fn clear_ghosts<F: Scalar>(floes: &mut Vec<Floe<F>>) {
    floes.retain(|f| !f.is_ghost());
    for f in floes.iter_mut() {
        f.ghosts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BoundaryKind;
    use crate::floe::factory::tests::floe_from;
    use crate::poly::Polygon;

    fn periodic_ew_domain() -> Domain<f64> {
        let c = BoundaryKind::Collision;
        let p = BoundaryKind::Periodic;
        Domain::new((c, 1e5), (c, 0.0), (p, 1e5), (p, 0.0), Vec::new()).unwrap()
    }

    #[test]
    fn floe_crossing_east_wall_gets_one_ghost() {
        let domain = periodic_ew_domain();
        let poly = Polygon::rect(Vec2::new(9.5e4, 4e4), Vec2::new(10.3e4, 5e4)).unwrap();
        let mut floes = vec![floe_from(poly)];
        floes[0].id = 1;
        let added = add_ghosts(&mut floes, &domain);
        assert_eq!(added, 1);
        assert_eq!(floes.len(), 2);
        let ghost = &floes[1];
        assert_eq!(ghost.ghost_id, 1);
        assert_eq!(ghost.id, 1);
        // Ghost is one domain width west of the parent.
        let dx = floes[0].centroid.x - ghost.centroid.x;
        assert!((dx - 1e5).abs() < 1e-6, "dx = {dx}");
        assert_eq!(floes[0].ghosts, vec![1]);
    }

    #[test]
    fn interior_floe_gets_no_ghost() {
        let domain = periodic_ew_domain();
        let poly = Polygon::rect(Vec2::new(4e4, 4e4), Vec2::new(6e4, 6e4)).unwrap();
        let mut floes = vec![floe_from(poly)];
        assert_eq!(add_ghosts(&mut floes, &domain), 0);
        assert_eq!(floes.len(), 1);
    }

    #[test]
    fn out_of_domain_parent_swaps_with_ghost() {
        let domain = periodic_ew_domain();
        // Centroid just past the east wall.
        let poly = Polygon::rect(Vec2::new(9.9e4, 4e4), Vec2::new(10.7e4, 5e4)).unwrap();
        let mut floes = vec![floe_from(poly)];
        add_ghosts(&mut floes, &domain);
        assert_eq!(floes.len(), 2);
        // After the swap, the real floe's centroid is back in the domain.
        assert!(domain.contains(floes[0].centroid));
        assert!(!domain.contains(floes[1].centroid));
    }

    #[test]
    fn clear_ghosts_restores_real_list() {
        let domain = periodic_ew_domain();
        let poly = Polygon::rect(Vec2::new(9.5e4, 4e4), Vec2::new(10.3e4, 5e4)).unwrap();
        let mut floes = vec![floe_from(poly)];
        add_ghosts(&mut floes, &domain);
        assert_eq!(floes.len(), 2);
        clear_ghosts(&mut floes);
        assert_eq!(floes.len(), 1);
        assert!(floes[0].ghosts.is_empty());
    }
}
