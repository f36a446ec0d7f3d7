//! Regular rectilinear grid and the Eulerian ocean/atmosphere fields.
//!
//! Grid lines are `xg[0..=nx]`, `yg[0..=ny]`; cell centers are `xc`, `yc`.
//! Field matrices carry one value per grid line point, `(nx+1)·(ny+1)`
//! values in row-major order. Per-cell accumulators (`CellFloes`,
//! `IceStressCell`) sit behind mutexes so coupling workers hitting the
//! same cell serialize on that cell alone.

use std::sync::Mutex;

use crate::constants::Constants;
use crate::error::{Result, SubzeroError};
use crate::math::{fl, Scalar, Vec2};
use crate::poly::Polygon;

/// Floes overlapping one grid-line point, with the periodic translation
/// that brought each there (zero for untranslated floes).
#[derive(Debug)]
pub struct CellFloes<F> {
    pub floe_idx: Vec<usize>,
    pub trans: Vec<Vec2<F>>,
}

impl<F> Default for CellFloes<F> {
    fn default() -> Self {
        Self {
            floe_idx: Vec::new(),
            trans: Vec::new(),
        }
    }
}

impl<F: Scalar> CellFloes<F> {
    pub fn push(&mut self, floe_idx: usize, trans: Vec2<F>) {
        self.floe_idx.push(floe_idx);
        self.trans.push(trans);
    }

    pub fn clear(&mut self) {
        self.floe_idx.clear();
        self.trans.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.floe_idx.is_empty()
    }
}

/// Per-cell reverse-stress accumulator: running sums per contributing floe
/// plus the summed ice area fraction.
#[derive(Debug)]
pub struct IceStressCell<F> {
    pub floe_idx: Vec<usize>,
    pub taux: Vec<F>,
    pub tauy: Vec<F>,
    pub npoints: Vec<usize>,
    pub si_frac: F,
}

impl<F: Scalar> Default for IceStressCell<F> {
    fn default() -> Self {
        Self {
            floe_idx: Vec::new(),
            taux: Vec::new(),
            tauy: Vec::new(),
            npoints: Vec::new(),
            si_frac: F::zero(),
        }
    }
}

impl<F: Scalar> IceStressCell<F> {
    /// Fold one floe's contribution into the running sums.
    pub fn add(&mut self, floe_idx: usize, taux: F, tauy: F, npoints: usize, frac: F) {
        match self.floe_idx.iter().position(|&i| i == floe_idx) {
            Some(k) => {
                self.taux[k] += taux;
                self.tauy[k] += tauy;
                self.npoints[k] += npoints;
            }
            None => {
                self.floe_idx.push(floe_idx);
                self.taux.push(taux);
                self.tauy.push(tauy);
                self.npoints.push(npoints);
            }
        }
        self.si_frac += frac;
    }

    pub fn clear(&mut self) {
        self.floe_idx.clear();
        self.taux.clear();
        self.tauy.clear();
        self.npoints.clear();
        self.si_frac = F::zero();
    }
}

/// Axis-aligned regular grid.
pub struct Grid<F> {
    pub nx: usize,
    pub ny: usize,
    /// Grid lines, `nx+1` / `ny+1` values.
    pub xg: Vec<F>,
    pub yg: Vec<F>,
    /// Cell centers, `nx` / `ny` values.
    pub xc: Vec<F>,
    pub yc: Vec<F>,
    /// Per grid-line point, `(nx+1)·(ny+1)`.
    pub cell_floes: Vec<Mutex<CellFloes<F>>>,
    /// Per cell, `nx·ny`.
    pub stress_cells: Vec<Mutex<IceStressCell<F>>>,
}

impl<F: Scalar> Grid<F> {
    /// Build from cell counts.
    pub fn from_counts(x0: F, xf: F, y0: F, yf: F, nx: usize, ny: usize) -> Result<Self> {
        if xf <= x0 || yf <= y0 {
            return Err(SubzeroError::DomainInvariant {
                reason: "grid extent must be positive on both axes".to_string(),
            });
        }
        if nx == 0 || ny == 0 {
            return Err(SubzeroError::ArgumentOutOfRange {
                name: "grid cell count",
                value: 0.0,
            });
        }
        let nxf = fl::<F>(nx as f64);
        let nyf = fl::<F>(ny as f64);
        let dx = (xf - x0) / nxf;
        let dy = (yf - y0) / nyf;
        let xg = (0..=nx).map(|i| x0 + dx * fl::<F>(i as f64)).collect();
        let yg = (0..=ny).map(|j| y0 + dy * fl::<F>(j as f64)).collect();
        let half = fl::<F>(0.5);
        let xc = (0..nx).map(|i| x0 + dx * (fl::<F>(i as f64) + half)).collect();
        let yc = (0..ny).map(|j| y0 + dy * (fl::<F>(j as f64) + half)).collect();
        let n_lines = (nx + 1) * (ny + 1);
        let n_cells = nx * ny;
        Ok(Self {
            nx,
            ny,
            xg,
            yg,
            xc,
            yc,
            cell_floes: (0..n_lines).map(|_| Mutex::new(CellFloes::default())).collect(),
            stress_cells: (0..n_cells)
                .map(|_| Mutex::new(IceStressCell::default()))
                .collect(),
        })
    }

    /// Build from target cell spacing; counts round to cover the extent.
    pub fn from_spacing(x0: F, xf: F, y0: F, yf: F, dx: F, dy: F) -> Result<Self> {
        if dx <= F::zero() || dy <= F::zero() {
            return Err(SubzeroError::ArgumentOutOfRange {
                name: "grid spacing",
                value: dx.min(dy).to_f64().unwrap_or(f64::NAN),
            });
        }
        let nx = ((xf - x0) / dx).round().to_usize().unwrap_or(0).max(1);
        let ny = ((yf - y0) / dy).round().to_usize().unwrap_or(0).max(1);
        Self::from_counts(x0, xf, y0, yf, nx, ny)
    }

    #[inline]
    pub fn dx(&self) -> F {
        self.xg[1] - self.xg[0]
    }

    #[inline]
    pub fn dy(&self) -> F {
        self.yg[1] - self.yg[0]
    }

    #[inline]
    pub fn cell_area(&self) -> F {
        self.dx() * self.dy()
    }

    /// Row-major index of a grid-line point.
    #[inline]
    pub fn line_index(&self, i: usize, j: usize) -> usize {
        j * (self.nx + 1) + i
    }

    /// Row-major index of a cell.
    #[inline]
    pub fn cell_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Cell containing a point, if inside the grid.
    pub fn cell_of(&self, p: Vec2<F>) -> Option<(usize, usize)> {
        if p.x < self.xg[0] || p.y < self.yg[0] {
            return None;
        }
        let i = ((p.x - self.xg[0]) / self.dx()).to_usize()?;
        let j = ((p.y - self.yg[0]) / self.dy()).to_usize()?;
        if i < self.nx && j < self.ny {
            Some((i, j))
        } else {
            None
        }
    }

    /// Cell polygon.
    pub fn cell_poly(&self, i: usize, j: usize) -> Polygon<F> {
        // Grid cells are valid rectangles by construction.
        Polygon::rect(
            Vec2::new(self.xg[i], self.yg[j]),
            Vec2::new(self.xg[i + 1], self.yg[j + 1]),
        )
        .expect("grid cell rectangle")
    }

    /// Mean of a line field's four values at the corners of cell `(i, j)`.
    pub fn cell_mean(&self, field: &[F], i: usize, j: usize) -> F {
        let quarter = fl::<F>(0.25);
        (field[self.line_index(i, j)]
            + field[self.line_index(i + 1, j)]
            + field[self.line_index(i, j + 1)]
            + field[self.line_index(i + 1, j + 1)])
            * quarter
    }

    /// Reset the per-cell accumulators at the start of a timestep.
    pub fn clear_accumulators(&self) {
        for c in &self.cell_floes {
            c.lock().unwrap().clear();
        }
        for c in &self.stress_cells {
            c.lock().unwrap().clear();
        }
    }
}

/// Ocean state on the grid lines.
pub struct Ocean<F> {
    pub u: Vec<F>,
    pub v: Vec<F>,
    pub temp: Vec<F>,
    pub taux: Vec<F>,
    pub tauy: Vec<F>,
    pub si_frac: Vec<F>,
    pub hflx_factor: Vec<F>,
    pub dissolved: Vec<F>,
}

impl<F: Scalar> Ocean<F> {
    /// Uniform ocean.
    pub fn uniform(grid: &Grid<F>, u: F, v: F, temp: F) -> Self {
        let n = (grid.nx + 1) * (grid.ny + 1);
        Self {
            u: vec![u; n],
            v: vec![v; n],
            temp: vec![temp; n],
            taux: vec![F::zero(); n],
            tauy: vec![F::zero(); n],
            si_frac: vec![F::zero(); n],
            hflx_factor: vec![F::zero(); n],
            dissolved: vec![F::zero(); n],
        }
    }

    /// Derive the heat-flux factor from the ocean/atmosphere temperature
    /// difference: `k·(T_atm − T_ocn)/(ρ_i·L)` per line point.
    pub fn compute_heat_flux(&mut self, atmos: &Atmos<F>, consts: &Constants<F>) {
        let scale = consts.thermal_conductivity / (consts.rho_ice * consts.latent_heat);
        for k in 0..self.temp.len() {
            self.hflx_factor[k] = scale * (atmos.temp[k] - self.temp[k]);
        }
    }

    pub fn clear_si_frac(&mut self) {
        for v in &mut self.si_frac {
            *v = F::zero();
        }
    }
}

/// Atmosphere state on the grid lines.
pub struct Atmos<F> {
    pub u: Vec<F>,
    pub v: Vec<F>,
    pub temp: Vec<F>,
}

impl<F: Scalar> Atmos<F> {
    pub fn uniform(grid: &Grid<F>, u: F, v: F, temp: F) -> Self {
        let n = (grid.nx + 1) * (grid.ny + 1);
        Self {
            u: vec![u; n],
            v: vec![v; n],
            temp: vec![temp; n],
        }
    }
}

/// Sanity checks on the heat budget, logged at construction.
///
/// Sea water freezes near −1.8 °C; configurations outside these regimes
/// still run, they just melt or grow ice quickly.
pub fn check_heat_budget<F: Scalar>(ocean: &Ocean<F>, atmos: &Atmos<F>) {
    let mean = |f: &[F]| -> F {
        let n = fl::<F>(f.len() as f64);
        f.iter().copied().sum::<F>() / n
    };
    let t_ocn = mean(&ocean.temp);
    let t_atm = mean(&atmos.temp);
    if t_ocn > t_atm {
        log::warn!(
            "ocean ({t_ocn}) warmer than atmosphere ({t_atm}): ice will grow from below"
        );
    }
    if t_atm > t_ocn {
        log::warn!(
            "atmosphere ({t_atm}) warmer than ocean ({t_ocn}): floes will lose mass"
        );
    }
    if t_ocn < fl(-1.8) || t_ocn > F::zero() {
        log::warn!("ocean temperature {t_ocn} outside the freezing range [-1.8, 0]");
    }
}
