//! Boolean operations on polygons.
//!
//! Greiner–Hormann clipping over the exterior rings: both operands may be
//! concave, and every operation returns a list of result pieces (possibly
//! empty). When the boundaries do not cross, containment fall-backs apply;
//! `difference` is the one operation that can introduce a hole (subtrahend
//! strictly inside the minuend).
//!
//! Tangential contacts (shared vertices, collinear overlapping edges) are
//! not crossings; they fall through to the containment tests. That is the
//! behavior the engines want: a grazing contact produces no overlap region
//! and therefore no force.

use crate::math::{fl, Scalar, Vec2};
use crate::poly::{seg_intersection, PointLocation, Polygon, BOUNDARY_EPS};

/// `a ∩ b` as a list of disjoint pieces.
pub fn intersect<F: Scalar>(a: &Polygon<F>, b: &Polygon<F>) -> Vec<Polygon<F>> {
    boolean_op(a, b, Op::Intersection)
}

/// `a \ b` as a list of pieces. If `b` sits strictly inside `a`, the
/// single piece is `a` with `b` as a hole.
pub fn difference<F: Scalar>(a: &Polygon<F>, b: &Polygon<F>) -> Vec<Polygon<F>> {
    boolean_op(a, b, Op::Difference)
}

/// `a ∪ b` as a list of pieces (two pieces when disjoint).
pub fn union<F: Scalar>(a: &Polygon<F>, b: &Polygon<F>) -> Vec<Polygon<F>> {
    boolean_op(a, b, Op::Union)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Intersection,
    Union,
    Difference,
}

/// Node of the doubly linked rings. Crossing nodes appear once on each
/// ring and are cross-linked through `neighbor`.
struct Node<F> {
    pos: Vec2<F>,
    next: usize,
    prev: usize,
    neighbor: usize,
    is_crossing: bool,
    entry: bool,
    visited: bool,
}

const NO_LINK: usize = usize::MAX;

fn boolean_op<F: Scalar>(a: &Polygon<F>, b: &Polygon<F>, op: Op) -> Vec<Polygon<F>> {
    // Bounding boxes disjoint: only union has a non-empty answer.
    let (alo, ahi) = a.bounding_box();
    let (blo, bhi) = b.bounding_box();
    if alo.x > bhi.x || blo.x > ahi.x || alo.y > bhi.y || blo.y > ahi.y {
        return no_crossing_result(a, b, op, false, false);
    }

    let ring_a = &a.exterior()[..a.exterior().len() - 1];
    let ring_b = &b.exterior()[..b.exterior().len() - 1];

    // Collect proper crossings between the original edges.
    struct Crossing<F> {
        edge_a: usize,
        edge_b: usize,
        t: F,
        u: F,
        pos: Vec2<F>,
    }
    let mut crossings: Vec<Crossing<F>> = Vec::new();
    let eps = fl::<F>(BOUNDARY_EPS);
    for (i, ea) in edge_iter(ring_a).enumerate() {
        for (j, eb) in edge_iter(ring_b).enumerate() {
            if let Some((t, u, pos)) = seg_intersection(ea.0, ea.1, eb.0, eb.1) {
                if !crossings.iter().any(|c| c.pos.distance(pos) <= eps) {
                    crossings.push(Crossing {
                        edge_a: i,
                        edge_b: j,
                        t,
                        u,
                        pos,
                    });
                }
            }
        }
    }

    if crossings.is_empty() {
        let a_in_b = b.locate(a.representative_point()) == PointLocation::Inside;
        let b_in_a = a.locate(b.representative_point()) == PointLocation::Inside;
        return no_crossing_result(a, b, op, a_in_b, b_in_a);
    }
    // A clean pair of rings crosses an even number of times; an odd count
    // means a tangency slipped through, and tracing would not terminate
    // cleanly.
    if crossings.len() % 2 != 0 {
        log::debug!(
            "boolean op fell back to empty result: {} boundary crossings",
            crossings.len()
        );
        return Vec::new();
    }

    // Build augmented node rings: original vertices with crossing nodes
    // spliced in along each edge, ordered by the edge parameter.
    let mut nodes: Vec<Node<F>> = Vec::new();
    let mut a_nodes_of_crossing = vec![NO_LINK; crossings.len()];
    let mut b_nodes_of_crossing = vec![NO_LINK; crossings.len()];

    let mut by_t: Vec<usize> = (0..crossings.len()).collect();
    by_t.sort_by(|&x, &y| {
        crossings[x]
            .t
            .partial_cmp(&crossings[y].t)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let a_start = nodes.len();
    for (i, &v) in ring_a.iter().enumerate() {
        push_node(&mut nodes, v, false);
        for &ci in by_t.iter().filter(|&&ci| crossings[ci].edge_a == i) {
            a_nodes_of_crossing[ci] = nodes.len();
            push_node(&mut nodes, crossings[ci].pos, true);
        }
    }
    let a_len = nodes.len() - a_start;
    link_ring(&mut nodes, a_start, a_len);

    let mut by_u: Vec<usize> = (0..crossings.len()).collect();
    by_u.sort_by(|&x, &y| {
        crossings[x]
            .u
            .partial_cmp(&crossings[y].u)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let b_start = nodes.len();
    for (j, &v) in ring_b.iter().enumerate() {
        push_node(&mut nodes, v, false);
        for &ci in by_u.iter().filter(|&&ci| crossings[ci].edge_b == j) {
            b_nodes_of_crossing[ci] = nodes.len();
            push_node(&mut nodes, crossings[ci].pos, true);
        }
    }
    let b_len = nodes.len() - b_start;
    link_ring(&mut nodes, b_start, b_len);

    for ci in 0..crossings.len() {
        let na = a_nodes_of_crossing[ci];
        let nb = b_nodes_of_crossing[ci];
        nodes[na].neighbor = nb;
        nodes[nb].neighbor = na;
    }

    // Entry flags: a crossing is an entry into the other polygon when the
    // midpoint of the segment just after it lies strictly inside. The
    // operation then flips flags per the Greiner–Hormann rules.
    let (flip_a, flip_b) = match op {
        Op::Intersection => (false, false),
        Op::Union => (true, true),
        Op::Difference => (true, false),
    };
    for idx in 0..nodes.len() {
        if !nodes[idx].is_crossing {
            continue;
        }
        let other = if idx < b_start { b } else { a };
        let flip = if idx < b_start { flip_a } else { flip_b };
        let mid = (nodes[idx].pos + nodes[nodes[idx].next].pos) * fl(0.5);
        let entry = other.locate(mid) == PointLocation::Inside;
        nodes[idx].entry = entry != flip;
    }

    trace_rings(&mut nodes)
}

fn push_node<F: Scalar>(nodes: &mut Vec<Node<F>>, pos: Vec2<F>, is_crossing: bool) {
    nodes.push(Node {
        pos,
        next: NO_LINK,
        prev: NO_LINK,
        neighbor: NO_LINK,
        is_crossing,
        entry: false,
        visited: false,
    });
}

fn link_ring<F: Scalar>(nodes: &mut [Node<F>], start: usize, len: usize) {
    for k in 0..len {
        let idx = start + k;
        nodes[idx].next = start + (k + 1) % len;
        nodes[idx].prev = start + (k + len - 1) % len;
    }
}

/// Walk the cross-linked rings, collecting one output ring per unvisited
/// crossing. Entry nodes are walked forward, exit nodes backward, switching
/// rings at every crossing.
fn trace_rings<F: Scalar>(nodes: &mut [Node<F>]) -> Vec<Polygon<F>> {
    let mut out = Vec::new();
    let budget = nodes.len() * 4;
    for start in 0..nodes.len() {
        if !nodes[start].is_crossing || nodes[start].visited {
            continue;
        }
        let mut ring: Vec<Vec2<F>> = vec![nodes[start].pos];
        let mut cur = start;
        let mut steps = 0usize;
        let closed = loop {
            nodes[cur].visited = true;
            let nb = nodes[cur].neighbor;
            nodes[nb].visited = true;
            let forward = nodes[cur].entry;
            loop {
                cur = if forward { nodes[cur].next } else { nodes[cur].prev };
                steps += 1;
                if steps > budget {
                    break;
                }
                ring.push(nodes[cur].pos);
                if nodes[cur].is_crossing {
                    break;
                }
            }
            if steps > budget {
                break false;
            }
            if cur == start || nodes[cur].neighbor == start {
                break true;
            }
            cur = nodes[cur].neighbor;
            if cur == start {
                break true;
            }
        };
        if !closed {
            log::debug!("boolean op trace exceeded budget, dropping partial ring");
            continue;
        }
        if let Ok(poly) = Polygon::new(ring, Vec::new()) {
            out.push(poly);
        }
    }
    // Slivers below the geometric tolerance are noise from near-tangent
    // crossings.
    out.retain(|p| p.area().abs() > fl(BOUNDARY_EPS));
    out
}

fn edge_iter<F: Scalar>(ring: &[Vec2<F>]) -> impl Iterator<Item = (Vec2<F>, Vec2<F>)> + '_ {
    (0..ring.len()).map(move |i| (ring[i], ring[(i + 1) % ring.len()]))
}

fn no_crossing_result<F: Scalar>(
    a: &Polygon<F>,
    b: &Polygon<F>,
    op: Op,
    a_in_b: bool,
    b_in_a: bool,
) -> Vec<Polygon<F>> {
    match op {
        Op::Intersection => {
            if a_in_b {
                vec![a.clone()]
            } else if b_in_a {
                vec![b.clone()]
            } else {
                Vec::new()
            }
        }
        Op::Difference => {
            if a_in_b {
                Vec::new()
            } else if b_in_a {
                // Subtrahend strictly inside: minuend gains a hole.
                let hole = b.exterior().to_vec();
                match Polygon::new(a.exterior().to_vec(), vec![hole]) {
                    Ok(p) => vec![p],
                    Err(_) => vec![a.clone()],
                }
            } else {
                vec![a.clone()]
            }
        }
        Op::Union => {
            if a_in_b {
                vec![b.clone()]
            } else if b_in_a {
                vec![a.clone()]
            } else {
                vec![a.clone(), b.clone()]
            }
        }
    }
}
