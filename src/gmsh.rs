//! Reading spatial meshes from and writing spacetime meshes to
//! [`gmsh`](https://www.gmsh.info/) `.msh` files.
//!
//! Only version 4.1 of the MSH format is supported,
//! as per the [`mshio`] library.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Write,
};

use itertools::Itertools;
use nalgebra as na;

use crate::{mesh::SimplicialMesh, spacetime::SpacetimeMesh};

/// Error in reading or writing a Gmsh .msh file.
#[derive(thiserror::Error, Debug)]
pub enum GmshError {
    /// Error parsing the .msh file.
    ///
    /// (Implementation note: parser error converted to string
    /// to avoid lifetime issues with the byte slices it contains)
    #[error("Parsing the .msh data failed")]
    ParseError(String),
    /// The given .msh file contains no nodes,
    /// or an element refers to a node tag beyond the nodes given.
    #[error("Invalid .msh data: missing nodes")]
    MissingNodes,
    /// The given .msh file contains no elements of the supported type.
    #[error("Invalid .msh data: no elements of the correct type")]
    MissingElements,
    /// Meshes of this dimension can't be written.
    #[error("Cannot write a {0}-dimensional mesh (only 2 and 3 are supported)")]
    UnsupportedDimension(usize),
    /// Error writing the output string.
    #[error("Formatting the .msh data failed")]
    FormatError(#[from] std::fmt::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct EntityId {
    dim: i32,
    tag: i32,
}

#[derive(Clone, Debug, Default)]
struct PhysicalGroup {
    entities: HashSet<EntityId>,
    nodes: HashSet<usize>,
}

/// Load a 1D line mesh from a `.msh` file.
///
/// First-order line elements of type `Lin2` (see [`ElementType`][mshio::ElementType])
/// are interpreted as the segments of the mesh.
/// The `y` and `z` coordinates of vertices are dropped.
///
/// See [`load_trimesh_2d`] for information about physical groups.
pub fn load_linemesh_1d(bytes: &[u8]) -> Result<SimplicialMesh<1>, GmshError> {
    load_simplicial_mesh(bytes, mshio::ElementType::Lin2)
}

/// Load a 2D triangle mesh from a `.msh` file.
///
/// First-order triangle elements in the file are interpreted as the triangles of the mesh.
/// These must be of type `Tri3` (see [`ElementType`][mshio::ElementType]).
/// The `z` coordinate of vertices is dropped to project the mesh to 2D space.
///
/// # Physical groups
///
/// Every physical group containing curves becomes a boundary region of the mesh
/// (in 1D, points; in 3D, surfaces),
/// named after the group's integer tag and declared in ascending tag order.
/// Named groups are currently not supported due to limitations of [`mshio`].
///
/// A region contains the mesh boundary facets where **every** vertex belongs to the group.
/// Consequently the group must also contain the boundary entities of its curves.
/// For example, to give the bottom edge of a triangle its own region,
/// you could use the following geometry:
/// ```text
/// Point(1) = {-1, 0, 0, 0.1};
/// Point(2) = {1, 0, 0, 0.1};
/// Point(3) = {0, 1, 0, 0.1};
/// Line(1) = {1, 2};
/// Line(2) = {2, 3};
/// Line(3) = {3, 1};
/// Curve Loop(1) = {1, 2, 3};
/// Plane Surface(1) = {1};
///
/// Physical Curve(100) = {1};
/// Physical Point(100) = {1, 2}; // also add the curve endpoints!
/// ```
/// (note: gmsh does not save elements that aren't part of a physical group by default,
/// so remember to use `-save_all` if you copy this code)
pub fn load_trimesh_2d(bytes: &[u8]) -> Result<SimplicialMesh<2>, GmshError> {
    load_simplicial_mesh(bytes, mshio::ElementType::Tri3)
}

/// Load a 3D tetrahedral mesh from a `.msh` file.
///
/// First-order tetrahedron elements in the file are interpreted as the tetrahedra of the mesh.
/// These must be of type `Tet4` (see [`ElementType`][mshio::ElementType]).
///
/// See [`load_trimesh_2d`] for information about physical groups.
pub fn load_tetmesh_3d(bytes: &[u8]) -> Result<SimplicialMesh<3>, GmshError> {
    load_simplicial_mesh(bytes, mshio::ElementType::Tet4)
}

fn load_simplicial_mesh<const DIM: usize>(
    bytes: &[u8],
    element_type: mshio::ElementType,
) -> Result<SimplicialMesh<DIM>, GmshError> {
    let msh = mshio::parse_msh_bytes(bytes).map_err(|e| GmshError::ParseError(format!("{}", e)))?;
    let nodes = msh.data.nodes.ok_or(GmshError::MissingNodes)?;
    let elements = msh.data.elements.ok_or(GmshError::MissingElements)?;

    let mut physical_groups = gather_physical_groups(msh.data.entities.as_ref());

    let mut vertices: Vec<na::SVector<f64, DIM>> = Vec::new();
    for block in &nodes.node_blocks {
        let ent_id = EntityId {
            dim: block.entity_dim,
            tag: block.entity_tag,
        };
        let mut phys_groups: Vec<&mut PhysicalGroup> = physical_groups
            .values_mut()
            .filter(|pg| pg.entities.contains(&ent_id))
            .collect();

        for node in &block.nodes {
            let vert_idx = vertices.len();
            let coords = [node.x, node.y, node.z];
            vertices.push(na::SVector::from_fn(|i, _| coords[i]));
            for g in &mut phys_groups {
                g.nodes.insert(vert_idx);
            }
        }
    }

    if vertices.is_empty() {
        return Err(GmshError::MissingNodes);
    }

    let vertex_count = vertices.len();
    let indices: Vec<usize> = elements
        .element_blocks
        .iter()
        .filter(|block| block.element_type == element_type)
        .flat_map(|block| block.elements.iter())
        .flat_map(|el| el.nodes.iter())
        // gmsh tags start at 1, subtract 1 to get the index in the array.
        // (this assumes tags are sequential and in order)
        .map(|node_tag| match (*node_tag as usize).checked_sub(1) {
            Some(idx) if idx < vertex_count => Ok(idx),
            _ => Err(GmshError::MissingNodes),
        })
        .collect::<Result<_, _>>()?;
    if indices.is_empty() {
        return Err(GmshError::MissingElements);
    }

    let mut mesh = SimplicialMesh::new(vertices, indices);
    let facet_dim = DIM as i32 - 1;
    for (group_id, group) in &physical_groups {
        if !group.entities.iter().any(|e| e.dim == facet_dim) {
            continue;
        }
        let facets: Vec<usize> = mesh
            .boundary_facets()
            .ones()
            .filter(|&f| {
                mesh.facet_indices(f)
                    .iter()
                    .all(|v| group.nodes.contains(v))
            })
            .collect();
        log::debug!("physical group {group_id}: {} boundary facets", facets.len());
        mesh.add_boundary_region(format!("{}", group_id), facets);
    }

    Ok(mesh)
}

/// Collect the physical groups defined in a .msh file
/// into a structure we can easily look them up from, ordered by tag.
///
/// This only populates the `entities` field of each group;
/// nodes need to be filled in by the loader.
fn gather_physical_groups(
    entities: Option<&mshio::Entities<i32, f64>>,
) -> BTreeMap<i32, PhysicalGroup> {
    let Some(entities) = entities else {
        return BTreeMap::new();
    };

    let mut groups: BTreeMap<i32, PhysicalGroup> = BTreeMap::new();
    let mut add = |dim: i32, tag: i32, physical_tags: &[i32]| {
        for ptag in physical_tags {
            groups
                .entry(*ptag)
                .or_default()
                .entities
                .insert(EntityId { dim, tag });
        }
    };

    for point in &entities.points {
        add(0, point.tag, &point.physical_tags);
    }
    for curve in &entities.curves {
        add(1, curve.tag, &curve.physical_tags);
    }
    for surface in &entities.surfaces {
        add(2, surface.tag, &surface.physical_tags);
    }
    for volume in &entities.volumes {
        add(3, volume.tag, &volume.physical_tags);
    }

    groups
}

/// Write a 2D or 3D spacetime mesh in the ASCII MSH 4.1 format.
///
/// The volume elements form one entity of the mesh's dimension
/// in a physical group named "domain".
/// Each surface region becomes an entity one dimension lower
/// with a physical group of the same name,
/// tagged with its index plus one.
/// Periodic identifications are written as one `$Periodic` link per identifier
/// on the volume entity, listing (servant, master) node pairs.
///
/// ```
/// # use tentslab::{mesh::generators, tents::*, convert::*, gmsh::write_msh};
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mesh = generators::interval_mesh(0.0, 1.0, 4);
/// let slab = TentSequence::from_tents(&mesh, 0.1, vec![Tent { vertex: 2, level: 0, top_time: 0.1 }]);
/// let converted = SlabConverter::<_, 1, 2>::new(&slab, ConvertParams::default())?.convert()?;
/// let msh = write_msh(&converted.mesh)?;
/// assert!(msh.starts_with("$MeshFormat\n4.1 0 8\n"));
/// # Ok(())
/// # }
/// # run().expect("writing failed");
/// ```
pub fn write_msh<const DIM: usize>(mesh: &SpacetimeMesh<DIM>) -> Result<String, GmshError> {
    let (volume_type, facet_type) = match DIM {
        2 => (2, 1),
        3 => (4, 2),
        _ => return Err(GmshError::UnsupportedDimension(DIM)),
    };
    let points = mesh.vertices();
    let regions = mesh.regions();
    let domain_tag = regions.len() + 1;

    let bounds = |verts: &mut dyn Iterator<Item = usize>| {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for (i, v) in verts.enumerate() {
            for d in 0..DIM {
                let x = points[v][d];
                if i == 0 || x < min[d] {
                    min[d] = x;
                }
                if i == 0 || x > max[d] {
                    max[d] = x;
                }
            }
        }
        (min, max)
    };

    let mut out = String::new();
    writeln!(out, "$MeshFormat\n4.1 0 8\n$EndMeshFormat")?;

    writeln!(out, "$PhysicalNames\n{}", regions.len() + 1)?;
    for (idx, name) in regions.iter().enumerate() {
        writeln!(out, "{} {} \"{name}\"", DIM - 1, idx + 1)?;
    }
    writeln!(out, "{DIM} {domain_tag} \"domain\"\n$EndPhysicalNames")?;

    // one entity per region plus the volume
    writeln!(out, "$Entities")?;
    let mut counts = [0; 4];
    counts[DIM - 1] = regions.len();
    counts[DIM] = 1;
    writeln!(out, "{} {} {} {}", counts[0], counts[1], counts[2], counts[3])?;
    for idx in 0..regions.len() {
        let (min, max) = bounds(
            &mut mesh
                .surface_elements_in(idx)
                .flat_map(|s| s.vertices.iter().copied()),
        );
        writeln!(
            out,
            "{} {} {} {} {} {} {} 1 {} 0",
            idx + 1,
            min[0],
            min[1],
            min[2],
            max[0],
            max[1],
            max[2],
            idx + 1
        )?;
    }
    let (min, max) = bounds(&mut (0..points.len()));
    writeln!(
        out,
        "1 {} {} {} {} {} {} 1 {domain_tag} {} {}\n$EndEntities",
        min[0],
        min[1],
        min[2],
        max[0],
        max[1],
        max[2],
        regions.len(),
        (1..=regions.len()).join(" "),
    )?;

    // all nodes belong to the volume entity
    let node_count = points.len();
    writeln!(out, "$Nodes\n1 {node_count} 1 {node_count}")?;
    writeln!(out, "{DIM} 1 0 {node_count}")?;
    for tag in 1..=node_count {
        writeln!(out, "{tag}")?;
    }
    for p in points {
        let coords: Vec<f64> = (0..3).map(|i| if i < DIM { p[i] } else { 0.0 }).collect();
        writeln!(out, "{} {} {}", coords[0], coords[1], coords[2])?;
    }
    writeln!(out, "$EndNodes")?;

    // elements: the volume block first, then a block per nonempty region
    let region_sizes: Vec<usize> = (0..regions.len())
        .map(|idx| mesh.surface_elements_in(idx).count())
        .collect();
    let block_count = 1 + region_sizes.iter().filter(|&&n| n > 0).count();
    let element_count = mesh.element_count() + mesh.surface_elements().len();
    writeln!(
        out,
        "$Elements\n{block_count} {element_count} 1 {element_count}"
    )?;
    let mut elem_tag = 1;
    writeln!(out, "{DIM} 1 {volume_type} {}", mesh.element_count())?;
    for element in mesh.elements() {
        write!(out, "{elem_tag}")?;
        for v in element {
            write!(out, " {}", v + 1)?;
        }
        writeln!(out)?;
        elem_tag += 1;
    }
    for (idx, &size) in region_sizes.iter().enumerate() {
        if size == 0 {
            continue;
        }
        writeln!(out, "{} {} {facet_type} {size}", DIM - 1, idx + 1)?;
        for surf in mesh.surface_elements_in(idx) {
            write!(out, "{elem_tag}")?;
            for v in &surf.vertices {
                write!(out, " {}", v + 1)?;
            }
            writeln!(out)?;
            elem_tag += 1;
        }
    }
    writeln!(out, "$EndElements")?;

    if !mesh.identifications().is_empty() {
        let mut links: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for id in mesh.identifications() {
            links
                .entry(id.ident)
                .or_default()
                .push((id.servant, id.master));
        }
        writeln!(out, "$Periodic\n{}", links.len())?;
        for node_pairs in links.values() {
            writeln!(out, "{DIM} 1 1\n0\n{}", node_pairs.len())?;
            for (servant, master) in node_pairs {
                writeln!(out, "{} {}", servant + 1, master + 1)?;
            }
        }
        writeln!(out, "$EndPeriodic")?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::{ConvertParams, SlabConverter},
        mesh::generators,
        tents::layered_tents,
    };

    /// Three nodes on the x axis, with the end points in physical groups 1 and 2.
    const LINE_MSH: &str = "\
$MeshFormat
4.1 0 8
$EndMeshFormat
$Entities
2 1 0 0
1 0 0 0 1 1
2 1 0 0 1 2
1 0 0 0 1 0 0 0 2 1 -2
$EndEntities
$Nodes
3 3 1 3
0 1 0 1
1
0 0 0
0 2 0 1
2
1 0 0
1 1 0 1
3
0.5 0 0
$EndNodes
$Elements
1 2 1 2
1 1 1 2
1 1 3
2 3 2
$EndElements
";

    /// The unit square split into two triangles,
    /// with the bottom edge and its end points in physical group 100.
    const SQUARE_MSH: &str = "\
$MeshFormat
4.1 0 8
$EndMeshFormat
$Entities
4 1 1 0
1 0 0 0 1 100
2 1 0 0 1 100
3 1 1 0 0
4 0 1 0 0
1 0 0 0 1 0 0 1 100 2 1 -2
1 0 0 0 1 1 0 0 1 1
$EndEntities
$Nodes
4 4 1 4
0 1 0 1
1
0 0 0
0 2 0 1
2
1 0 0
0 3 0 1
3
1 1 0
0 4 0 1
4
0 1 0
$EndNodes
$Elements
2 3 1 3
1 1 1 1
1 1 2
2 1 2 2
2 1 2 3
3 1 3 4
$EndElements
";

    /// A single tetrahedron with the face at z = 0 in physical group 100.
    const TET_MSH: &str = "\
$MeshFormat
4.1 0 8
$EndMeshFormat
$Entities
4 0 1 1
1 0 0 0 1 100
2 1 0 0 1 100
3 0 1 0 1 100
4 0 0 1 0
1 0 0 0 1 1 0 1 100 0
1 0 0 0 1 1 1 0 1 1
$EndEntities
$Nodes
4 4 1 4
0 1 0 1
1
0 0 0
0 2 0 1
2
1 0 0
0 3 0 1
3
0 1 0
0 4 0 1
4
0 0 1
$EndNodes
$Elements
1 1 1 1
3 1 4 1
1 1 2 3 4
$EndElements
";

    #[test]
    fn load_line_mesh_with_end_groups() {
        let mesh = load_linemesh_1d(LINE_MSH.as_bytes()).expect("Failed to load mesh");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.simplex_count::<1>(), 2);
        assert_eq!(mesh.vertices()[2].x, 0.5);

        let regions = mesh.boundary_regions();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "1");
        itertools::assert_equal(regions[0].vertices.ones(), [0]);
        assert_eq!(regions[1].name, "2");
        itertools::assert_equal(regions[1].vertices.ones(), [1]);
    }

    #[test]
    fn load_triangles_with_bottom_group() {
        let mesh = load_trimesh_2d(SQUARE_MSH.as_bytes()).expect("Failed to load mesh");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.simplex_count::<2>(), 2);

        let regions = mesh.boundary_regions();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, "100");
        assert_eq!(regions[0].facets.count_ones(..), 1);
        for facet in regions[0].facets.ones() {
            for &v in mesh.facet_indices(facet) {
                assert_eq!(mesh.vertices()[v].y, 0.);
            }
        }
    }

    #[test]
    fn load_tetrahedron_with_bottom_group() {
        let mesh = load_tetmesh_3d(TET_MSH.as_bytes()).expect("Failed to load mesh");
        assert_eq!(mesh.simplex_count::<3>(), 1);

        let regions = mesh.boundary_regions();
        assert_eq!(regions.len(), 1);
        let faces: Vec<usize> = regions[0].facets.ones().collect();
        assert_eq!(faces.len(), 1);
        assert_eq!(mesh.facet_indices(faces[0]), &[0, 1, 2]);
    }

    #[test]
    fn missing_sections_are_errors() {
        let no_elements = "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n";
        assert!(load_trimesh_2d(no_elements.as_bytes()).is_err());
        // a line mesh has no triangles
        assert!(matches!(
            load_trimesh_2d(LINE_MSH.as_bytes()),
            Err(GmshError::MissingElements)
        ));
        // the second segment refers to a node that was never defined
        let dangling = LINE_MSH.replace("2 3 2\n", "2 3 7\n");
        assert!(matches!(
            load_linemesh_1d(dangling.as_bytes()),
            Err(GmshError::MissingNodes)
        ));
    }

    #[test]
    fn write_periodic_spacetime_mesh() {
        let mesh = generators::rectangle_mesh_periodic_x(
            na::Vector2::new(0.0, 0.0),
            na::Vector2::new(1.0, 1.0),
            2,
            1,
        );
        let slab = layered_tents(&mesh, 0.5, 1);
        let converted = SlabConverter::<_, 2, 3>::new(&slab, ConvertParams::default())
            .unwrap()
            .convert()
            .unwrap();
        let st_mesh = &converted.mesh;
        let msh = write_msh(st_mesh).unwrap();

        let section = |name: &str| {
            let start = format!("${name}\n");
            let end = format!("$End{name}");
            let from = msh.find(&start).expect("section exists") + start.len();
            let to = msh.find(&end).expect("section ends");
            msh[from..to].lines().collect::<Vec<_>>()
        };

        let names = section("PhysicalNames");
        assert_eq!(names[0], "7");
        assert_eq!(names[1], "2 1 \"bottom\"");
        assert_eq!(names[5], "2 5 \"base\"");
        assert_eq!(names[7], "3 7 \"domain\"");

        let nodes = section("Nodes");
        assert_eq!(nodes.len(), 2 + 2 * st_mesh.vertex_count());

        let elements = section("Elements");
        let total = st_mesh.element_count() + st_mesh.surface_elements().len();
        assert!(elements[0].ends_with(&format!("{total} 1 {total}")));
        assert_eq!(elements[1], format!("3 1 4 {}", st_mesh.element_count()));
        // a line per element plus a header per block
        let block_count: usize = elements[0]
            .split(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert_eq!(elements.len(), 1 + block_count + total);

        // one link for the single periodic direction
        let periodic = section("Periodic");
        assert_eq!(periodic[0], "1");
        assert_eq!(periodic[3], st_mesh.identifications().len().to_string());
        let first = st_mesh.identifications()[0];
        assert_eq!(
            periodic[4],
            format!("{} {}", first.servant + 1, first.master + 1)
        );
    }
}
