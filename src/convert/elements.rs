use super::{ConvertError, FrontTable};
use crate::{mesh::SimplicialMesh, spacetime::SpacetimeMeshBuilder};

/// Build one volume element per spatial element around every vertex realized in a front,
/// front by front.
///
/// Each element starts with the newly realized vertex
/// followed by the latest earlier realization of every vertex of the spatial element
/// (including the apex's own spatial vertex),
/// in the spatial element's vertex order.
pub(super) fn add_volume_elements<const DIM: usize, const ST_DIM: usize>(
    mesh: &SimplicialMesh<DIM>,
    fronts: &FrontTable,
    builder: &mut SpacetimeMeshBuilder<ST_DIM>,
) -> Result<(), ConvertError> {
    let mut element = Vec::with_capacity(ST_DIM + 1);
    for front in 1..fronts.front_count() {
        for &apex in fronts.front_vertices(front) {
            let apex_stv = fronts.realized(front, apex)?;
            for &elem_idx in mesh.elements_around(apex) {
                element.clear();
                element.push(apex_stv);
                for &w in mesh.simplex_indices_dyn(DIM, elem_idx) {
                    element.push(fronts.prev_realization(w, front)?);
                }
                builder.add_volume_element(&element);
            }
        }
    }
    log::debug!(
        "{} volume elements over {} fronts",
        builder.volume_elements().len(),
        fronts.front_count()
    );
    Ok(())
}
