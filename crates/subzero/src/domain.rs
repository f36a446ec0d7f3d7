//! Simulation domain: four directional walls plus immovable topography.
//!
//! Wall behavior is a tagged variant dispatched with a `match` at the
//! collision call sites. Opposite walls must agree on periodicity, and the
//! bounds must not be inverted; both are checked once, at construction.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubzeroError};
use crate::math::{Scalar, Vec2};
use crate::poly::Polygon;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Behavior of one wall.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BoundaryKind<F> {
    /// Floes crossing the wall are removed.
    Open,
    /// Paired with the opposite wall; floes wrap and ghosts replicate.
    Periodic,
    /// Rigid wall exerting contact forces.
    Collision,
    /// Rigid wall translating with the given velocity.
    Moving { u: F, v: F },
}

impl<F: Scalar> BoundaryKind<F> {
    pub fn is_periodic(&self) -> bool {
        matches!(self, BoundaryKind::Periodic)
    }

    /// Wall velocity seen by the friction model.
    pub fn velocity(&self) -> Vec2<F> {
        match self {
            BoundaryKind::Moving { u, v } => Vec2::new(*u, *v),
            _ => Vec2::zero(),
        }
    }
}

/// One directional wall: its kind, edge coordinate, and a bounding-box
/// polygon covering everything beyond the edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Boundary<F> {
    pub direction: Direction,
    pub kind: BoundaryKind<F>,
    pub val: F,
    pub poly: Polygon<F>,
}

impl<F: Scalar> Boundary<F> {
    /// Advance a moving wall by one timestep. Other kinds are unchanged.
    pub fn advance(&mut self, dt: F) {
        if let BoundaryKind::Moving { u, v } = self.kind {
            let d = Vec2::new(u * dt, v * dt);
            self.val += match self.direction {
                Direction::North | Direction::South => v * dt,
                Direction::East | Direction::West => u * dt,
            };
            self.poly.translate(d);
        }
    }

    /// Interaction-table partner id for this wall.
    pub fn partner_id(&self) -> i64 {
        match self.direction {
            Direction::North => -1,
            Direction::South => -2,
            Direction::East => -3,
            Direction::West => -4,
        }
    }
}

/// Immovable, unbreakable grounded feature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopographyElement<F> {
    pub poly: Polygon<F>,
    pub centroid: Vec2<F>,
    pub rmax: F,
}

impl<F: Scalar> TopographyElement<F> {
    /// Holes are discarded; grounded features are solid.
    pub fn new(poly: Polygon<F>) -> Self {
        let poly = poly.without_holes();
        let centroid = poly.centroid();
        let rmax = poly.max_radius();
        Self {
            poly,
            centroid,
            rmax,
        }
    }

    /// Interaction-table partner id for topography element `k`.
    pub fn partner_id(k: usize) -> i64 {
        -(5 + k as i64)
    }
}

/// The bounded world: four walls and the topography list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Domain<F> {
    pub north: Boundary<F>,
    pub south: Boundary<F>,
    pub east: Boundary<F>,
    pub west: Boundary<F>,
    pub topography: Vec<TopographyElement<F>>,
}

impl<F: Scalar> Domain<F> {
    /// Build and validate a domain.
    ///
    /// `north_val > south_val` and `east_val > west_val` are required, and
    /// each opposite pair must be both periodic or both non-periodic.
    pub fn new(
        north: (BoundaryKind<F>, F),
        south: (BoundaryKind<F>, F),
        east: (BoundaryKind<F>, F),
        west: (BoundaryKind<F>, F),
        topography: Vec<TopographyElement<F>>,
    ) -> Result<Self> {
        if north.1 <= south.1 {
            return Err(SubzeroError::DomainInvariant {
                reason: format!("north wall ({}) must be above south wall ({})", north.1, south.1),
            });
        }
        if east.1 <= west.1 {
            return Err(SubzeroError::DomainInvariant {
                reason: format!("east wall ({}) must be right of west wall ({})", east.1, west.1),
            });
        }
        if north.0.is_periodic() != south.0.is_periodic() {
            return Err(SubzeroError::DomainInvariant {
                reason: "north and south walls must share periodicity".to_string(),
            });
        }
        if east.0.is_periodic() != west.0.is_periodic() {
            return Err(SubzeroError::DomainInvariant {
                reason: "east and west walls must share periodicity".to_string(),
            });
        }

        let width = east.1 - west.1;
        let height = north.1 - south.1;
        let pad = width.max(height);
        let wall_poly = |dir: Direction| -> Result<Polygon<F>> {
            let (lo, hi) = match dir {
                Direction::North => (
                    Vec2::new(west.1 - pad, north.1),
                    Vec2::new(east.1 + pad, north.1 + pad),
                ),
                Direction::South => (
                    Vec2::new(west.1 - pad, south.1 - pad),
                    Vec2::new(east.1 + pad, south.1),
                ),
                Direction::East => (
                    Vec2::new(east.1, south.1 - pad),
                    Vec2::new(east.1 + pad, north.1 + pad),
                ),
                Direction::West => (
                    Vec2::new(west.1 - pad, south.1 - pad),
                    Vec2::new(west.1, north.1 + pad),
                ),
            };
            Polygon::rect(lo, hi)
        };

        Ok(Self {
            north: Boundary {
                direction: Direction::North,
                kind: north.0,
                val: north.1,
                poly: wall_poly(Direction::North)?,
            },
            south: Boundary {
                direction: Direction::South,
                kind: south.0,
                val: south.1,
                poly: wall_poly(Direction::South)?,
            },
            east: Boundary {
                direction: Direction::East,
                kind: east.0,
                val: east.1,
                poly: wall_poly(Direction::East)?,
            },
            west: Boundary {
                direction: Direction::West,
                kind: west.0,
                val: west.1,
                poly: wall_poly(Direction::West)?,
            },
            topography,
        })
    }

    /// All four walls, collision-wall order: north, south, east, west.
    pub fn walls(&self) -> [&Boundary<F>; 4] {
        [&self.north, &self.south, &self.east, &self.west]
    }

    pub fn width(&self) -> F {
        self.east.val - self.west.val
    }

    pub fn height(&self) -> F {
        self.north.val - self.south.val
    }

    pub fn periodic_x(&self) -> bool {
        self.east.kind.is_periodic()
    }

    pub fn periodic_y(&self) -> bool {
        self.north.kind.is_periodic()
    }

    /// Whether a point lies inside the domain box.
    pub fn contains(&self, p: Vec2<F>) -> bool {
        p.x >= self.west.val && p.x <= self.east.val && p.y >= self.south.val && p.y <= self.north.val
    }

    /// Translation that wraps a point back into the domain across the
    /// periodic axes. Zero when the point is in bounds or the axis is not
    /// periodic.
    pub fn wrap_translation(&self, p: Vec2<F>) -> Vec2<F> {
        let mut t = Vec2::zero();
        if self.periodic_x() {
            if p.x < self.west.val {
                t.x = self.width();
            } else if p.x > self.east.val {
                t.x = -self.width();
            }
        }
        if self.periodic_y() {
            if p.y < self.south.val {
                t.y = self.height();
            } else if p.y > self.north.val {
                t.y = -self.height();
            }
        }
        t
    }

    /// Shrink-fit check used when tiling initial floe fields.
    pub fn bounds_poly(&self) -> Result<Polygon<F>> {
        Polygon::rect(
            Vec2::new(self.west.val, self.south.val),
            Vec2::new(self.east.val, self.north.val),
        )
    }
}
