//! Ocean/atmosphere forcing.
//!
//! For each real floe, the grid cells whose centers fall inside the floe's
//! bounding disc are intersected with the floe polygon; over each
//! overlapped cell the atmospheric drag, ocean drag (rotated by the
//! turning angle), pressure-gradient and Coriolis terms act on the overlap
//! area, and their torques act about the floe centroid. Ghost footprints
//! contribute through the parent with the cell arm taken in the ghost
//! frame, which is what the periodic wrap means physically.
//!
//! The pass is parallel over floes; the only shared writes are the
//! per-cell accumulators, which serialize on their own mutex. The reverse
//! stress on the ocean is folded into the line matrices afterwards, on the
//! driver thread.

use rayon::prelude::*;

use crate::constants::Constants;
use crate::floe::Floe;
use crate::grid::{Atmos, Grid, Ocean};
use crate::math::{Scalar, Vec2};
use crate::poly::clip;

/// Compute `fx_oa`, `fy_oa`, `trq_oa` and the mean heat-flux factor for
/// every real floe, and accumulate reverse stress into the grid cells.
///
/// `floes[..n_real]` are the real floes; entries beyond are this step's
/// ghosts (read-only here).
pub fn oa_forcing<F: Scalar>(
    floes: &mut [Floe<F>],
    n_real: usize,
    grid: &Grid<F>,
    ocean: &Ocean<F>,
    atmos: &Atmos<F>,
    consts: &Constants<F>,
) {
    let (reals, ghost_slice) = floes.split_at_mut(n_real);
    let ghosts: &[Floe<F>] = ghost_slice;

    reals.par_iter_mut().enumerate().for_each(|(idx, floe)| {
        floe.fx_oa = F::zero();
        floe.fy_oa = F::zero();
        floe.trq_oa = F::zero();

        // The floe's own frame plus one frame per ghost replica.
        let mut translations = vec![Vec2::zero()];
        for &g in &floe.ghosts {
            let ghost = &ghosts[g - n_real];
            translations.push(ghost.centroid - floe.centroid);
        }

        let mut hflx_weighted = F::zero();
        let mut overlap_total = F::zero();
        for trans in translations {
            couple_one_frame(
                idx,
                floe,
                trans,
                grid,
                ocean,
                atmos,
                consts,
                &mut hflx_weighted,
                &mut overlap_total,
            );
        }
        floe.hflx_factor = if overlap_total > F::zero() {
            hflx_weighted / overlap_total
        } else {
            F::zero()
        };
    });
}

#[allow(clippy::too_many_arguments)]
fn couple_one_frame<F: Scalar>(
    floe_idx: usize,
    floe: &mut Floe<F>,
    trans: Vec2<F>,
    grid: &Grid<F>,
    ocean: &Ocean<F>,
    atmos: &Atmos<F>,
    consts: &Constants<F>,
    hflx_weighted: &mut F,
    overlap_total: &mut F,
) {
    let center = floe.centroid + trans;
    let shape = floe.poly.translated(trans);
    let cell_area = grid.cell_area();
    let mass_per_area = floe.mass / floe.area;

    // Candidate cell window from the bounding disc.
    let lo_i = ((center.x - floe.rmax - grid.xg[0]) / grid.dx())
        .floor()
        .to_isize()
        .unwrap_or(0)
        .max(0) as usize;
    let lo_j = ((center.y - floe.rmax - grid.yg[0]) / grid.dy())
        .floor()
        .to_isize()
        .unwrap_or(0)
        .max(0) as usize;
    let hi_i = (((center.x + floe.rmax - grid.xg[0]) / grid.dx()).ceil())
        .to_usize()
        .unwrap_or(grid.nx)
        .min(grid.nx);
    let hi_j = (((center.y + floe.rmax - grid.yg[0]) / grid.dy()).ceil())
        .to_usize()
        .unwrap_or(grid.ny)
        .min(grid.ny);

    let mut fx = F::zero();
    let mut fy = F::zero();
    let mut trq = F::zero();

    for cj in lo_j..hi_j {
        for ci in lo_i..hi_i {
            let cc = Vec2::new(grid.xc[ci], grid.yc[cj]);
            if cc.distance(center) > floe.rmax {
                continue;
            }
            let overlap: F = clip::intersect(&shape, &grid.cell_poly(ci, cj))
                .iter()
                .map(|p| p.area())
                .sum();
            if overlap <= F::zero() {
                continue;
            }
            let ratio = overlap / cell_area;

            // Local ice velocity at the cell center (arm in this frame).
            let u_ice = floe.u - floe.xi * (cc.y - center.y);
            let v_ice = floe.v + floe.xi * (cc.x - center.x);

            // Atmospheric drag.
            let ua = grid.cell_mean(&atmos.u, ci, cj);
            let va = grid.cell_mean(&atmos.v, ci, cj);
            let wind = Vec2::new(ua, va);
            let f_atm = wind * (consts.rho_air * consts.c_ia * wind.length() * overlap);

            // Ocean drag with the turning angle.
            let uo = grid.cell_mean(&ocean.u, ci, cj);
            let vo = grid.cell_mean(&ocean.v, ci, cj);
            let dv = Vec2::new(uo - u_ice, vo - v_ice);
            let tau = dv.rotate(consts.turn_angle)
                * (consts.rho_ocean * consts.c_io * dv.length());
            let f_ocn = tau * overlap;

            // Pressure gradient balancing the geostrophic ocean, and the
            // Coriolis force on the floe itself.
            let f_pg = Vec2::new(-vo, uo) * (mass_per_area * consts.f_coriolis * overlap);
            let f_cor = Vec2::new(v_ice, -u_ice) * (mass_per_area * consts.f_coriolis * overlap);

            let f_cell = f_atm + f_ocn + f_pg + f_cor;
            fx += f_cell.x;
            fy += f_cell.y;
            trq += (cc - center).perp_dot(f_cell);

            // Heat flux under this patch of floe.
            let hf = grid.cell_mean(&ocean.hflx_factor, ci, cj);
            *hflx_weighted += hf * overlap;
            *overlap_total += overlap;

            // Sub-floe points landing in this cell.
            let npoints = floe
                .x_subfloe
                .iter()
                .zip(floe.y_subfloe.iter())
                .filter(|&(&x, &y)| {
                    grid.cell_of(Vec2::new(center.x + x, center.y + y)) == Some((ci, cj))
                })
                .count();

            // Reverse stress on the ocean and ice cover registration.
            {
                let mut cell = grid.stress_cells[grid.cell_index(ci, cj)].lock().unwrap();
                cell.add(floe_idx, -tau.x * ratio, -tau.y * ratio, npoints, ratio);
            }
            {
                let mut lines = grid.cell_floes[grid.line_index(ci, cj)].lock().unwrap();
                lines.push(floe_idx, trans);
            }
        }
    }

    floe.fx_oa += fx;
    floe.fy_oa += fy;
    floe.trq_oa += trq;
}

/// Fold the per-cell accumulators into the ocean line matrices. Serial;
/// called once per timestep after the coupling pass.
///
/// Line points whose `CellFloes` registry is empty saw no ice this step
/// and keep zero stress and ice fraction.
pub fn fold_reverse_stress<F: Scalar>(grid: &Grid<F>, ocean: &mut Ocean<F>) {
    for cj in 0..grid.ny {
        for ci in 0..grid.nx {
            let line = grid.line_index(ci, cj);
            if grid.cell_floes[line].lock().unwrap().is_empty() {
                continue;
            }
            let cell = grid.stress_cells[grid.cell_index(ci, cj)].lock().unwrap();
            let mut tx = F::zero();
            let mut ty = F::zero();
            for k in 0..cell.floe_idx.len() {
                tx += cell.taux[k];
                ty += cell.tauy[k];
            }
            ocean.taux[line] = tx;
            ocean.tauy[line] = ty;
            ocean.si_frac[line] = cell.si_frac.min(F::one());
        }
    }
}
