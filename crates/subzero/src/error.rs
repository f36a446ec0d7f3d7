//! Fatal error kinds.
//!
//! Only constructor-time problems are errors: bad rings, inverted domains,
//! nonsense arguments. Runtime geometric failures (empty intersections,
//! zero-area pieces) are recoverable at the floe level and never surface
//! here; convergence and thermodynamic anomalies are logged warnings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubzeroError {
    /// Polygon ring with fewer than 3 distinct points, or collapsed onto a
    /// line.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// Boundary configuration violating the domain rules (inverted bounds,
    /// mismatched periodicity).
    #[error("domain invariant violated: {reason}")]
    DomainInvariant { reason: String },

    /// Negative radius, zero mass, non-positive spacing and the like.
    #[error("argument out of range: {name} = {value}")]
    ArgumentOutOfRange { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, SubzeroError>;
