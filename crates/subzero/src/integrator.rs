//! Second-order rigid-body time integration.
//!
//! Positions and velocities advance with a two-step Adams–Bashforth-like
//! update (`1.5·Δt·f − 0.5·Δt·f_prev`), which needs the previous step's
//! derivatives carried on the floe. Several guards keep pathological
//! states from blowing up the step: a height cap, a mass floor that marks
//! the floe for removal, a geometric runaway limit on collision forces,
//! and per-component acceleration clamps tied to the floe thickness.

use rayon::prelude::*;

use crate::floe::{Floe, Status};
use crate::math::{fl, Scalar, Vec2};

/// Mass floor below which a floe is resurrected and marked for removal.
const MASS_FLOOR: f64 = 100.0;
/// Replacement mass for floor violations, so the step stays finite.
const RESURRECT_MASS: f64 = 1e3;
/// Spin magnitude cap (rad/s).
const XI_CAP: f64 = 1e-5;

/// Advance every real floe by one timestep.
pub fn step_floes<F: Scalar>(floes: &mut [Floe<F>], n_real: usize, max_height: F, dt: F) {
    floes[..n_real]
        .par_iter_mut()
        .for_each(|f| step_one(f, max_height, dt));
}

fn step_one<F: Scalar>(floe: &mut Floe<F>, max_height: F, dt: F) {
    let half = fl::<F>(0.5);
    let three_half = fl::<F>(1.5);

    if floe.height > max_height {
        floe.height = max_height;
    }
    if floe.mass < fl(MASS_FLOOR) {
        floe.mass = fl(RESURRECT_MASS);
        floe.status = Status::Remove;
    }

    // Runaway collision forces get damped until the impulse this step
    // cannot exceed mass/(5Δt).
    let limit = floe.mass / (fl::<F>(5.0) * dt);
    while floe.collision_force.x.abs().max(floe.collision_force.y.abs()) > limit {
        floe.collision_force = floe.collision_force * fl(0.1);
        floe.collision_trq *= fl(0.1);
    }

    // Thermodynamic thinning/thickening from the ocean heat flux.
    if floe.hflx_factor != F::zero() && floe.height > F::zero() {
        let dh = floe.hflx_factor * dt / floe.height;
        let scale = (floe.height - dh) / floe.height;
        if scale > F::zero() {
            floe.mass *= scale;
            floe.moment *= scale;
            floe.height -= dh;
        }
    }

    // Position step.
    let dx = three_half * dt * floe.u - half * dt * floe.p_dxdt;
    let dy = three_half * dt * floe.v - half * dt * floe.p_dydt;
    let dalpha = three_half * dt * floe.xi - half * dt * floe.p_dalphadt;
    floe.p_dxdt = floe.u;
    floe.p_dydt = floe.v;
    floe.p_dalphadt = floe.xi;

    floe.poly.translate(Vec2::new(dx, dy));
    floe.centroid += Vec2::new(dx, dy);
    if dalpha != F::zero() {
        floe.poly.rotate_about(floe.centroid, dalpha);
        floe.alpha += dalpha;
        // Sub-floe offsets ride along with the rotation.
        let (s, c) = (dalpha.sin(), dalpha.cos());
        for k in 0..floe.x_subfloe.len() {
            let x = floe.x_subfloe[k];
            let y = floe.y_subfloe[k];
            floe.x_subfloe[k] = c * x - s * y;
            floe.y_subfloe[k] = s * x + c * y;
        }
    }

    // Acceleration, clamped so no component moves faster than h/2 per
    // step worth of velocity change.
    let mut dudt = (floe.fx_oa + floe.collision_force.x) / floe.mass;
    let mut dvdt = (floe.fy_oa + floe.collision_force.y) / floe.mass;
    let cap = floe.height * half;
    let du_step = (dt * dudt).abs();
    let dv_step = (dt * dvdt).abs();
    if du_step > cap || dv_step > cap {
        let frac = (cap / du_step.max(F::epsilon())).min(cap / dv_step.max(F::epsilon()));
        dudt *= frac;
        dvdt *= frac;
    }

    // Velocity step.
    let u_new = floe.u + three_half * dt * dudt - half * dt * floe.p_dudt;
    let v_new = floe.v + three_half * dt * dvdt - half * dt * floe.p_dvdt;
    floe.p_dudt = dudt;
    floe.p_dvdt = dvdt;
    floe.u = u_new;
    floe.v = v_new;

    let dxidt = (floe.trq_oa + floe.collision_trq) / floe.moment;
    let xi_new = floe.xi + three_half * dt * dxidt - half * dt * floe.p_dxidt;
    floe.p_dxidt = dxidt;
    let cap_xi = fl::<F>(XI_CAP);
    floe.xi = xi_new.max(-cap_xi).min(cap_xi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::floe::factory::tests::floe_from;
    use crate::math::Vec2;
    use crate::poly::Polygon;

    fn test_floe() -> Floe<f64> {
        let poly =
            Polygon::rect(Vec2::new(0.0, 0.0), Vec2::new(1000.0, 1000.0)).unwrap();
        floe_from(poly)
    }

    #[test]
    fn free_drift_advances_position() {
        let mut floes = vec![test_floe()];
        floes[0].u = 0.2;
        floes[0].p_dxdt = 0.2;
        let dt = 10.0;
        step_floes(&mut floes, 1, 10.0, dt);
        // With u == p_dxdt the AB step reduces to dt*u.
        assert!((floes[0].centroid.x - 502.0).abs() < 1e-9);
        assert!((floes[0].poly.centroid().x - 502.0).abs() < 1e-9);
    }

    #[test]
    fn constant_force_accelerates() {
        let mut floes = vec![test_floe()];
        let m = floes[0].mass;
        floes[0].fx_oa = m * 1e-5; // a = 1e-5 m/s^2, well under the clamp
        let dt = 10.0;
        step_floes(&mut floes, 1, 10.0, dt);
        // First step from rest: u = 1.5*dt*a (no history yet).
        assert!((floes[0].u - 1.5 * 10.0 * 1e-5).abs() < 1e-12);
        assert!((floes[0].p_dudt - 1e-5).abs() < 1e-18);
    }

    #[test]
    fn acceleration_clamp_binds() {
        let mut floes = vec![test_floe()];
        let m = floes[0].mass;
        // Huge force: dt*a would exceed h/2 = 0.5 m/s.
        floes[0].fx_oa = m * 10.0;
        let dt = 10.0;
        step_floes(&mut floes, 1, 10.0, dt);
        // Clamped acceleration: dt*du = h/2, so u = 1.5 * h/2.
        assert!(floes[0].u <= 1.5 * 0.5 + 1e-9, "u = {}", floes[0].u);
    }

    #[test]
    fn runaway_collision_force_scaled_down() {
        let mut floes = vec![test_floe()];
        let m = floes[0].mass;
        let dt = 10.0;
        floes[0].collision_force = Vec2::new(m, 0.0); // far beyond m/(5dt)
        step_floes(&mut floes, 1, 10.0, dt);
        let limit = m / (5.0 * dt);
        assert!(floes[0].collision_force.x <= limit);
    }

    #[test]
    fn mass_floor_marks_removal() {
        let mut floes = vec![test_floe()];
        floes[0].mass = 1.0;
        step_floes(&mut floes, 1, 10.0, 10.0);
        assert_eq!(floes[0].status, Status::Remove);
        assert!((floes[0].mass - 1e3).abs() < 1e-12);
    }

    #[test]
    fn spin_is_clamped() {
        let mut floes = vec![test_floe()];
        floes[0].collision_trq = floes[0].moment; // dxi = 1 rad/s^2
        step_floes(&mut floes, 1, 10.0, 10.0);
        assert!(floes[0].xi.abs() <= 1e-5 + 1e-18);
    }

    #[test]
    fn heat_flux_thins_the_floe() {
        let mut floes = vec![test_floe()];
        let m0 = floes[0].mass;
        floes[0].hflx_factor = 1e-4; // melting
        step_floes(&mut floes, 1, 10.0, 10.0);
        assert!(floes[0].height < 1.0);
        assert!(floes[0].mass < m0);
    }
}
