use std::collections::BTreeMap;

use super::{ConvertError, FrontTable};
use crate::{mesh::SimplicialMesh, spacetime::SpacetimeMesh};

/// Map from spatial degrees of freedom to spacetime degrees of freedom,
/// one per front.
///
/// Degrees of freedom are numbered vertices first, then edges:
/// spatial edge `e` is DOF `spatial_vertex_count + e`
/// and spacetime edge `e` is DOF `spacetime_vertex_count + e`.
/// Edge DOFs are only present for second-order maps.
#[derive(Clone, Debug)]
pub struct DofMap {
    fronts: Vec<BTreeMap<usize, usize>>,
    order: usize,
    spatial_dof_count: usize,
    spacetime_dof_count: usize,
}

impl DofMap {
    /// Number of fronts, including front 0.
    #[inline]
    pub fn front_count(&self) -> usize {
        self.fronts.len()
    }

    /// Polynomial order the map was built for.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Total number of spatial DOFs.
    #[inline]
    pub fn spatial_dof_count(&self) -> usize {
        self.spatial_dof_count
    }

    /// Total number of spacetime DOFs.
    #[inline]
    pub fn spacetime_dof_count(&self) -> usize {
        self.spacetime_dof_count
    }

    /// The map of a single front, from spatial DOF to spacetime DOF.
    ///
    /// # Panics
    ///
    /// If `front >= self.front_count()`.
    #[inline]
    pub fn front(&self, front: usize) -> &BTreeMap<usize, usize> {
        assert!(front < self.fronts.len(), "front index out of range");
        &self.fronts[front]
    }

    /// Look up the spacetime DOF of a spatial DOF in a front.
    ///
    /// # Panics
    ///
    /// If `front >= self.front_count()`.
    #[inline]
    pub fn get(&self, front: usize, spatial_dof: usize) -> Option<usize> {
        self.front(front).get(&spatial_dof).copied()
    }

    /// Write spatial values into a spacetime field
    /// at the DOFs realized in the given front.
    ///
    /// # Panics
    ///
    /// If `front >= self.front_count()`
    /// or the lengths of the slices don't match the DOF counts.
    pub fn scatter(&self, front: usize, spatial: &[f64], field: &mut [f64]) {
        assert_eq!(spatial.len(), self.spatial_dof_count, "wrong spatial vector size");
        assert_eq!(field.len(), self.spacetime_dof_count, "wrong spacetime field size");
        for (&s, &st) in self.front(front) {
            field[st] = spatial[s];
        }
    }

    /// Read the spatial state of a spacetime field at a front.
    ///
    /// Every spatial DOF takes its value from its latest realization
    /// at or before the given front.
    /// DOFs without any such realization are NaN.
    ///
    /// # Panics
    ///
    /// If `front >= self.front_count()`
    /// or the length of the field doesn't match the spacetime DOF count.
    pub fn time_slice(&self, front: usize, field: &[f64]) -> Vec<f64> {
        assert!(front < self.fronts.len(), "front index out of range");
        assert_eq!(field.len(), self.spacetime_dof_count, "wrong spacetime field size");
        let mut slice = vec![f64::NAN; self.spatial_dof_count];
        for front_map in &self.fronts[..=front] {
            for (&s, &st) in front_map {
                slice[s] = field[st];
            }
        }
        slice
    }
}

/// Build the DOF map from the finished spacetime mesh.
///
/// In front 0, spatial edges that don't exist in the spacetime mesh
/// (because no tent was pitched next to them) are left unmapped.
/// In later fronts, every edge from a newly realized vertex
/// to the previous realization of its neighbor must exist.
pub(super) fn build_dof_map<const DIM: usize, const ST_DIM: usize>(
    mesh: &SimplicialMesh<DIM>,
    fronts: &FrontTable,
    st_mesh: &SpacetimeMesh<ST_DIM>,
    order: usize,
) -> Result<DofMap, ConvertError> {
    if !matches!(order, 1 | 2) {
        return Err(ConvertError::UnsupportedOrder(order));
    }

    let spatial_vert_count = mesh.vertex_count();
    let st_vert_count = st_mesh.vertex_count();

    let mut maps: Vec<BTreeMap<usize, usize>> = Vec::with_capacity(fronts.front_count());
    for front in 0..fronts.front_count() {
        let mut map = BTreeMap::new();
        for &v in fronts.front_vertices(front) {
            map.insert(v, fronts.realized(front, v)?);
        }
        maps.push(map);
    }

    if order == 1 {
        return Ok(DofMap {
            fronts: maps,
            order,
            spatial_dof_count: spatial_vert_count,
            spacetime_dof_count: st_vert_count,
        });
    }

    let mut unmapped = 0;
    for edge in 0..mesh.edge_count() {
        let [a, b] = mesh.edge_vertices(edge);
        let (a, b) = (fronts.realized(0, a)?, fronts.realized(0, b)?);
        match st_mesh.find_edge(a, b) {
            Some(st_edge) => {
                maps[0].insert(spatial_vert_count + edge, st_vert_count + st_edge);
            }
            None => unmapped += 1,
        }
    }
    if unmapped > 0 {
        log::debug!("{unmapped} spatial edges not present in the initial front");
    }

    for (front, map) in maps.iter_mut().enumerate().skip(1) {
        for &v in fronts.front_vertices(front) {
            let new_v = fronts.realized(front, v)?;
            for edge in mesh.edges_around(v) {
                let [a, b] = mesh.edge_vertices(edge);
                let w = if a == v { b } else { a };
                let old_w = fronts.prev_realization(w, front)?;
                let st_edge = st_mesh
                    .find_edge(new_v, old_w)
                    .ok_or(ConvertError::MissingEdge(new_v, old_w))?;
                map.insert(spatial_vert_count + edge, st_vert_count + st_edge);
            }
        }
    }

    Ok(DofMap {
        fronts: maps,
        order,
        spatial_dof_count: spatial_vert_count + mesh.edge_count(),
        spacetime_dof_count: st_vert_count + st_mesh.edge_count(),
    })
}
