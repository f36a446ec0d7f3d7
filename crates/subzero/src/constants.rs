//! Physical constants shared by every subsystem.
//!
//! All values are SI. Each constant is used by at least two modules;
//! keeping them in one struct prevents drift between the coupling,
//! collision and fracture code.

use serde::{Deserialize, Serialize};

use crate::math::{fl, Scalar};

/// Physical constants of the simulation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Constants<F> {
    /// Ice density (kg/m³).
    pub rho_ice: F,
    /// Ocean water density (kg/m³).
    pub rho_ocean: F,
    /// Air density (kg/m³).
    pub rho_air: F,
    /// Ice–ocean drag coefficient.
    pub c_io: F,
    /// Ice–atmosphere drag coefficient.
    pub c_ia: F,
    /// Atmosphere–ocean drag coefficient.
    pub c_ao: F,
    /// Coriolis parameter (1/s).
    pub f_coriolis: F,
    /// Ocean turning angle (radians).
    pub turn_angle: F,
    /// Latent heat of fusion for sea ice (J/kg).
    pub latent_heat: F,
    /// Thermal conductivity of ice (W/m/K).
    pub thermal_conductivity: F,
    /// Poisson's ratio.
    pub nu: F,
    /// Coulomb friction coefficient between floes.
    pub mu: F,
    /// Young's modulus (Pa).
    pub young: F,
}

impl<F: Scalar> Default for Constants<F> {
    fn default() -> Self {
        Self {
            rho_ice: fl(920.0),
            rho_ocean: fl(1027.0),
            rho_air: fl(1.2),
            c_io: fl(3e-3),
            c_ia: fl(1e-3),
            c_ao: fl(1.25e-3),
            f_coriolis: fl(1.4e-4),
            turn_angle: fl(15.0_f64.to_radians()),
            latent_heat: fl(2.93e5),
            thermal_conductivity: fl(2.14),
            nu: fl(0.3),
            mu: fl(0.2),
            young: fl(6e6),
        }
    }
}

impl<F: Scalar> Constants<F> {
    /// Shear modulus `G = E/(2(1+ν))`, used by the friction model.
    pub fn shear_modulus(&self) -> F {
        self.young / (fl::<F>(2.0) * (F::one() + self.nu))
    }
}
