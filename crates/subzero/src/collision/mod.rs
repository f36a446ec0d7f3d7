//! Collision engine.
//!
//! Three passes per timestep:
//!
//! 1. **Detect** (parallel): every floe scans partners with a higher index,
//!    prunes by bounding circles, deduplicates logical pairs across ghosts
//!    with the XOR-admit rule, and resolves overlap regions into contact
//!    forces. Real floes also contact the four walls and the topography.
//!    The pass is a pure map; nothing is written to the floe list.
//! 2. **Apply** (serial, driver thread): rows land in the owning floe's
//!    interaction table with a mirrored row (opposite force, same point
//!    and overlap) on the partner, fuse/remove marks resolve onto the real
//!    floes, and ghost tables fold into their parents with the contact
//!    points translated into the parent frame.
//! 3. **Total** (parallel): per-row torques about each real floe's
//!    centroid fill the torque column, and the force/torque sums become
//!    the floe's collision totals.

pub mod contact;
pub mod ghosts;

use std::sync::Mutex;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::constants::Constants;
use crate::domain::{Direction, Domain, TopographyElement};
use crate::floe::interactions::{COL_FX, COL_FY, COL_ID, COL_OVERLAP, COL_PX, COL_PY, COL_TORQUE};
use crate::floe::{Floe, Status};
use crate::math::{fl, Scalar, Vec2};
use crate::poly::clip;

use self::contact::{floe_floe_stiffness, floe_wall_stiffness, resolve_region, BodyMotion, Contact};

/// Overlap-fraction limits for fusing and wall removal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CollisionSettings<F> {
    /// Floe–floe overlap fraction beyond which the pair fuses.
    pub floe_floe_max_overlap: F,
    /// Floe–wall overlap fraction beyond which the floe is removed.
    pub floe_domain_max_overlap: F,
}

impl<F: Scalar> Default for CollisionSettings<F> {
    fn default() -> Self {
        Self {
            floe_floe_max_overlap: fl(0.55),
            floe_domain_max_overlap: fl(0.75),
        }
    }
}

struct RawRow<F> {
    j: usize,
    contact: Contact<F>,
}

struct WallRow<F> {
    partner: i64,
    contact: Contact<F>,
}

struct PassOne<F> {
    rows: Vec<RawRow<F>>,
    wall_rows: Vec<WallRow<F>>,
    /// Indices of partners this floe over-overlaps with.
    fuse_with: Vec<usize>,
    remove: bool,
    overarea: F,
}

/// Run the full collision step. `floes[..n_real]` are real; the rest are
/// this step's ghosts.
pub fn collide<F: Scalar>(
    floes: &mut [Floe<F>],
    n_real: usize,
    domain: &Domain<F>,
    consts: &Constants<F>,
    settings: &CollisionSettings<F>,
    dt: F,
) {
    let n = floes.len();
    floes.par_iter_mut().for_each(|f| f.reset_collision_state());

    // Pass 1: parallel detection over an immutable view.
    let dedup: Mutex<FxHashMap<(u64, u64), (u32, u32)>> = Mutex::new(FxHashMap::default());
    let results: Vec<PassOne<F>> = {
        let shared: &[Floe<F>] = floes;
        (0..n)
            .into_par_iter()
            .map(|i| pass_one(i, shared, n_real, domain, consts, settings, dt, &dedup))
            .collect()
    };

    let real_of_id: FxHashMap<u64, usize> =
        floes[..n_real].iter().enumerate().map(|(i, f)| (f.id, i)).collect();

    // Pass 2: serial application, mirroring, marks, ghost folding.
    for i in 0..n {
        let id_i = floes[i].id;
        let id_i_f = fl::<F>(id_i as f64);
        for row in &results[i].rows {
            let j = row.j;
            let id_j_f = fl::<F>(floes[j].id as f64);
            let c = row.contact;
            floes[i]
                .interactions
                .push(id_j_f, c.force.x, c.force.y, c.point.x, c.point.y, c.overlap);
            floes[j]
                .interactions
                .push(id_i_f, -c.force.x, -c.force.y, c.point.x, c.point.y, c.overlap);
            floes[j].overarea += c.overlap;
        }
        for wr in &results[i].wall_rows {
            let c = wr.contact;
            floes[i].interactions.push(
                fl(wr.partner as f64),
                c.force.x,
                c.force.y,
                c.point.x,
                c.point.y,
                c.overlap,
            );
        }
        floes[i].overarea += results[i].overarea;
        for &j in &results[i].fuse_with {
            let id_j = floes[j].id;
            if let Some(&ri) = real_of_id.get(&id_i) {
                floes[ri].status = Status::Fuse;
                floes[ri].fuse_with.push(id_j);
            }
            if let Some(&rj) = real_of_id.get(&id_j) {
                floes[rj].status = Status::Fuse;
                floes[rj].fuse_with.push(id_i);
            }
        }
        if results[i].remove {
            floes[i].status = Status::Remove;
        }
    }

    // Fold ghost interactions into their parents, contact points
    // translated back into the parent frame.
    let (reals, ghost_slice) = floes.split_at_mut(n_real);
    for g in ghost_slice.iter_mut() {
        if g.interactions.is_empty() {
            continue;
        }
        let Some(&pi) = real_of_id.get(&g.id) else {
            continue;
        };
        let parent = &mut reals[pi];
        let delta = parent.centroid - g.centroid;
        for row in g.interactions.rows() {
            parent.interactions.push(
                row[COL_ID],
                row[COL_FX],
                row[COL_FY],
                row[COL_PX] + delta.x,
                row[COL_PY] + delta.y,
                row[COL_OVERLAP],
            );
        }
        parent.overarea += g.overarea;
        g.interactions.clear();
    }

    // Pass 3: torques and totals, parallel over real floes.
    reals.par_iter_mut().for_each(|f| {
        let c = f.centroid;
        let mut force = Vec2::zero();
        let mut trq_sum = F::zero();
        for r in 0..f.interactions.len() {
            let row = f.interactions.row(r);
            let (fx, fy) = (row[COL_FX], row[COL_FY]);
            let (px, py) = (row[COL_PX], row[COL_PY]);
            let trq = (px - c.x) * fy - (py - c.y) * fx;
            f.interactions.row_mut(r)[COL_TORQUE] = trq;
            force.x += fx;
            force.y += fy;
            trq_sum += trq;
        }
        f.collision_force = force;
        f.collision_trq = trq_sum;
    });
}

#[allow(clippy::too_many_arguments)]
fn pass_one<F: Scalar>(
    i: usize,
    floes: &[Floe<F>],
    n_real: usize,
    domain: &Domain<F>,
    consts: &Constants<F>,
    settings: &CollisionSettings<F>,
    dt: F,
    dedup: &Mutex<FxHashMap<(u64, u64), (u32, u32)>>,
) -> PassOne<F> {
    let fi = &floes[i];
    let mut out = PassOne {
        rows: Vec::new(),
        wall_rows: Vec::new(),
        fuse_with: Vec::new(),
        remove: false,
        overarea: F::zero(),
    };
    let motion_i = BodyMotion {
        vel: Vec2::new(fi.u, fi.v),
        xi: fi.xi,
        center: fi.centroid,
    };

    for (j, fj) in floes.iter().enumerate().skip(i + 1) {
        // Same id means same real/ghost family.
        if fi.id == fj.id {
            continue;
        }
        if fi.centroid.distance(fj.centroid) > fi.rmax + fj.rmax {
            continue;
        }
        // XOR-admit: the first ghost pairing seen for a logical pair wins;
        // later pairings pass only if they share at least one side with
        // it, which kills repeats through the second periodic axis.
        let (key, val) = if fi.id > fj.id {
            ((fi.id, fj.id), (fi.ghost_id, fj.ghost_id))
        } else {
            ((fj.id, fi.id), (fj.ghost_id, fi.ghost_id))
        };
        let admit = {
            let mut map = dedup.lock().unwrap();
            match map.entry(key) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(val);
                    true
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    let g = *e.get();
                    g.0 == val.0 || g.1 == val.1
                }
            }
        };
        if !admit {
            continue;
        }

        let regions = clip::intersect(&fi.poly, &fj.poly);
        if regions.is_empty() {
            continue;
        }
        let total: F = regions.iter().map(|r| r.area()).sum();
        if total / fi.area > settings.floe_floe_max_overlap
            || total / fj.area > settings.floe_floe_max_overlap
        {
            out.fuse_with.push(j);
            continue;
        }

        let min_region =
            fl::<F>(fi.poly.num_vertices().min(fj.poly.num_vertices()) as f64 * 100.0 / 1.75);
        let stiffness = floe_floe_stiffness(consts, fi.height, fi.area, fj.height, fj.area);
        let motion_j = BodyMotion {
            vel: Vec2::new(fj.u, fj.v),
            xi: fj.xi,
            center: fj.centroid,
        };
        for region in &regions {
            if region.area() < min_region {
                continue;
            }
            if let Some(c) = resolve_region(
                &fi.poly, &fj.poly, region, stiffness, &motion_i, &motion_j, consts, dt, None,
            ) {
                out.rows.push(RawRow { j, contact: c });
            }
        }
        out.overarea += total;
    }

    // Ghosts only exist to carry floe–floe contact across the wrap; the
    // domain acts on real floes.
    if i < n_real {
        domain_pass(fi, &motion_i, domain, consts, settings, dt, &mut out);
    }
    out
}

fn domain_pass<F: Scalar>(
    fi: &Floe<F>,
    motion_i: &BodyMotion<F>,
    domain: &Domain<F>,
    consts: &Constants<F>,
    settings: &CollisionSettings<F>,
    dt: F,
    out: &mut PassOne<F>,
) {
    for wall in domain.walls() {
        let near = match wall.direction {
            Direction::North => fi.centroid.y + fi.rmax > wall.val,
            Direction::South => fi.centroid.y - fi.rmax < wall.val,
            Direction::East => fi.centroid.x + fi.rmax > wall.val,
            Direction::West => fi.centroid.x - fi.rmax < wall.val,
        };
        if !near {
            continue;
        }
        match wall.kind {
            crate::domain::BoundaryKind::Periodic => {}
            crate::domain::BoundaryKind::Open => {
                let total: F = clip::intersect(&fi.poly, &wall.poly)
                    .iter()
                    .map(|r| r.area())
                    .sum();
                if total > F::zero() {
                    out.remove = true;
                }
            }
            crate::domain::BoundaryKind::Collision | crate::domain::BoundaryKind::Moving { .. } => {
                let regions = clip::intersect(&fi.poly, &wall.poly);
                if regions.is_empty() {
                    continue;
                }
                let total: F = regions.iter().map(|r| r.area()).sum();
                if total / fi.area > settings.floe_domain_max_overlap {
                    out.remove = true;
                    continue;
                }
                let stiffness = floe_wall_stiffness(consts, fi.height, fi.area);
                let axis = match wall.direction {
                    Direction::North => Vec2::new(F::zero(), -F::one()),
                    Direction::South => Vec2::new(F::zero(), F::one()),
                    Direction::East => Vec2::new(-F::one(), F::zero()),
                    Direction::West => Vec2::new(F::one(), F::zero()),
                };
                let motion_w = BodyMotion::moving(wall.kind.velocity());
                for region in &regions {
                    if let Some(c) = resolve_region(
                        &fi.poly,
                        &wall.poly,
                        region,
                        stiffness,
                        motion_i,
                        &motion_w,
                        consts,
                        dt,
                        Some(axis),
                    ) {
                        out.wall_rows.push(WallRow {
                            partner: wall.partner_id(),
                            contact: c,
                        });
                    }
                }
                out.overarea += total;
            }
        }
    }

    for (k, topo) in domain.topography.iter().enumerate() {
        if fi.centroid.distance(topo.centroid) > fi.rmax + topo.rmax {
            continue;
        }
        let regions = clip::intersect(&fi.poly, &topo.poly);
        if regions.is_empty() {
            continue;
        }
        let total: F = regions.iter().map(|r| r.area()).sum();
        if total / fi.area > settings.floe_domain_max_overlap {
            out.remove = true;
            continue;
        }
        let stiffness = floe_wall_stiffness(consts, fi.height, fi.area);
        let min_region =
            fl::<F>(fi.poly.num_vertices().min(topo.poly.num_vertices()) as f64 * 100.0 / 1.75);
        for region in &regions {
            if region.area() < min_region {
                continue;
            }
            if let Some(c) = resolve_region(
                &fi.poly,
                &topo.poly,
                region,
                stiffness,
                motion_i,
                &BodyMotion::fixed(),
                consts,
                dt,
                None,
            ) {
                out.wall_rows.push(WallRow {
                    partner: TopographyElement::<F>::partner_id(k),
                    contact: c,
                });
            }
        }
        out.overarea += total;
    }
}
