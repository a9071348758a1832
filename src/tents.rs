//! Input side of a slab conversion: tents pitched on a spatial mesh.
//!
//! Pitching tents is not done in this crate.
//! A tent-pitching algorithm hands its result over
//! through the [`TentSlab`] trait,
//! or by filling a [`TentSequence`] directly.

use crate::{mesh::SimplicialMesh, periodic::PeriodicClosure};

/// A single tent: one spatial vertex (the apex)
/// advanced from its current time to a new top time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tent {
    /// Index of the apex vertex in the spatial mesh.
    pub vertex: usize,
    /// Causal layer the tent was pitched in.
    /// The tent's apex belongs to front `level + 1`.
    pub level: usize,
    /// Time of the apex after the tent is pitched.
    pub top_time: f64,
}

/// A tent-pitched slab of spacetime over a spatial mesh.
///
/// Tents are expected in a causally valid order:
/// a tent's neighbors that are pitched later have a higher level.
/// This is not checked.
pub trait TentSlab<const DIM: usize> {
    /// The spatial mesh the tents are pitched on.
    fn mesh(&self) -> &SimplicialMesh<DIM>;
    /// Number of tents in the slab.
    fn tent_count(&self) -> usize;
    /// Get the tent at the given position in pitching order.
    fn tent(&self, idx: usize) -> Tent;
    /// Number of causal layers. Every tent's level is below this.
    fn layer_count(&self) -> usize;
    /// Final time of the slab. Tents reaching it lie on the final time slice.
    fn slab_height(&self) -> f64;
}

/// A list of tents over a borrowed spatial mesh.
#[derive(Clone, Debug)]
pub struct TentSequence<'a, const DIM: usize> {
    mesh: &'a SimplicialMesh<DIM>,
    tents: Vec<Tent>,
    slab_height: f64,
}

impl<'a, const DIM: usize> TentSequence<'a, DIM> {
    /// Create an empty slab of the given height.
    pub fn new(mesh: &'a SimplicialMesh<DIM>, slab_height: f64) -> Self {
        Self {
            mesh,
            tents: Vec::new(),
            slab_height,
        }
    }

    /// Create a slab from tents already in pitching order.
    pub fn from_tents(mesh: &'a SimplicialMesh<DIM>, slab_height: f64, tents: Vec<Tent>) -> Self {
        Self {
            mesh,
            tents,
            slab_height,
        }
    }

    /// Append a tent at the end of the pitching order.
    pub fn push(&mut self, tent: Tent) {
        self.tents.push(tent);
    }

    /// Get the tents in pitching order.
    #[inline]
    pub fn tents(&self) -> &[Tent] {
        &self.tents
    }
}

impl<'a, const DIM: usize> TentSlab<DIM> for TentSequence<'a, DIM> {
    #[inline]
    fn mesh(&self) -> &SimplicialMesh<DIM> {
        self.mesh
    }

    #[inline]
    fn tent_count(&self) -> usize {
        self.tents.len()
    }

    #[inline]
    fn tent(&self, idx: usize) -> Tent {
        self.tents[idx]
    }

    fn layer_count(&self) -> usize {
        self.tents.iter().map(|t| t.level + 1).max().unwrap_or(0)
    }

    #[inline]
    fn slab_height(&self) -> f64 {
        self.slab_height
    }
}

/// Pitch a causally valid slab by brute force for testing:
/// vertices are greedily colored so that no two neighbors share a color,
/// and in each of `rounds` rounds every color class is advanced in turn,
/// all vertices gaining `slab_height / rounds` per round.
///
/// Periodic servants are never pitched themselves;
/// they follow their master, and their neighbors count as the master's.
///
/// This is public for use in other modules' tests and hidden from docs.
#[doc(hidden)]
pub fn layered_tents<const DIM: usize>(
    mesh: &SimplicialMesh<DIM>,
    slab_height: f64,
    rounds: usize,
) -> TentSequence<'_, DIM> {
    let closure = PeriodicClosure::new(mesh.periodic_pairs());
    let vert_count = mesh.vertex_count();

    // the pitched vertex standing in for every vertex
    let mut representative: Vec<usize> = (0..vert_count).collect();
    for master in (0..vert_count).filter(|&v| !closure.is_servant(v)) {
        for &servant in closure.servants_of(master) {
            representative[servant] = master;
        }
    }

    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); vert_count];
    for edge in 0..mesh.edge_count() {
        let [a, b] = mesh.edge_vertices(edge).map(|v| representative[v]);
        if a != b {
            neighbors[a].push(b);
            neighbors[b].push(a);
        }
    }

    let mut colors: Vec<Option<usize>> = vec![None; vert_count];
    let mut color_count = 0;
    for v in (0..vert_count).filter(|&v| representative[v] == v) {
        let color = (0..)
            .find(|c| !neighbors[v].iter().any(|&n| colors[n] == Some(*c)))
            .unwrap_or_default();
        colors[v] = Some(color);
        color_count = color_count.max(color + 1);
    }

    let mut slab = TentSequence::new(mesh, slab_height);
    for round in 0..rounds {
        let top_time = if round + 1 == rounds {
            slab_height
        } else {
            slab_height * (round + 1) as f64 / rounds as f64
        };
        for color in 0..color_count {
            for (vertex, _) in colors
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Some(color))
            {
                slab.push(Tent {
                    vertex,
                    level: round * color_count + color,
                    top_time,
                });
            }
        }
    }
    slab
}
