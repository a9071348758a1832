use std::collections::HashSet;

use super::FrontTable;
use crate::{
    mesh::SimplicialMesh,
    spacetime::{Identification, IdentificationKind, SpacetimeMeshBuilder},
};

/// Identify the realizations of every periodic vertex pair
/// in every front where the master is realized.
///
/// Identifiers are shifted up by one so that 0 stays free.
/// Each unordered pair of spacetime vertices is identified at most once,
/// so declaring a pair in both directions has no extra effect.
pub(super) fn add_identifications<const DIM: usize, const ST_DIM: usize>(
    mesh: &SimplicialMesh<DIM>,
    fronts: &FrontTable,
    builder: &mut SpacetimeMeshBuilder<ST_DIM>,
) {
    let pairs = mesh.periodic_pairs();
    if pairs.is_empty() {
        return;
    }

    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut skipped = 0;
    for pair in pairs {
        for &front in fronts.vertex_fronts(pair.master) {
            let Some(servant) = fronts.spacetime_vertex(front, pair.servant) else {
                skipped += 1;
                continue;
            };
            let Some(master) = fronts.spacetime_vertex(front, pair.master) else {
                continue;
            };
            if !seen.insert((master.min(servant), master.max(servant))) {
                continue;
            }
            builder.add_identification(Identification {
                master,
                servant,
                ident: pair.ident + 1,
                kind: IdentificationKind::Periodic,
            });
        }
    }

    if skipped > 0 {
        log::warn!(
            "{skipped} periodic pairs skipped because the servant was not realized with its master"
        );
    }
    log::debug!("{} periodic identifications", seen.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::{fronts::add_vertices, ConvertParams, SlabConverter},
        mesh::generators,
        periodic::PeriodicClosure,
        tents::{layered_tents, Tent, TentSequence},
    };
    use approx::assert_relative_eq;

    #[test]
    fn identifications_in_every_front() {
        let mesh = generators::rectangle_mesh_periodic_x(
            nalgebra::Vector2::new(0.0, 0.0),
            nalgebra::Vector2::new(3.0, 1.0),
            3,
            2,
        );
        let slab = layered_tents(&mesh, 0.5, 2);
        let converted = SlabConverter::<_, 2, 3>::new(&slab, ConvertParams::default())
            .unwrap()
            .convert()
            .unwrap();
        let st_mesh = &converted.mesh;
        let fronts = &converted.fronts;
        let idents = st_mesh.identifications();

        // front 0 plus one front per round for each of the 3 pairs
        assert_eq!(idents.len(), 3 * 3);

        let mut seen = HashSet::new();
        for id in idents {
            assert_eq!(id.ident, 1);
            assert_eq!(id.kind, IdentificationKind::Periodic);
            assert!(seen.insert((id.master.min(id.servant), id.master.max(id.servant))));

            // same front, mirrored across the periodic boundary
            let (m, s) = (st_mesh.vertices()[id.master], st_mesh.vertices()[id.servant]);
            assert_relative_eq!(m.x + 3.0, s.x);
            assert_relative_eq!(m.y, s.y);
            assert_relative_eq!(m.z, s.z);
            let (m_origin, s_origin) = (fronts.origin(id.master), fronts.origin(id.servant));
            assert!(mesh
                .periodic_pairs()
                .iter()
                .any(|p| p.master == m_origin && p.servant == s_origin));
        }
        assert_eq!(st_mesh.topology().periodic_pairs().len(), idents.len());
    }

    #[test]
    fn reverse_pairs_are_not_repeated() {
        let mut mesh = generators::interval_mesh(0.0, 1.0, 2);
        mesh.add_periodic_pair(0, 2, 0);
        mesh.add_periodic_pair(2, 0, 0);
        let tents = [(0, 0, 0.5), (1, 1, 0.5), (0, 2, 1.0)]
            .into_iter()
            .map(|(vertex, level, top_time)| Tent {
                vertex,
                level,
                top_time,
            })
            .collect();
        let slab = TentSequence::from_tents(&mesh, 1.0, tents);
        let converted = SlabConverter::<_, 1, 2>::new(&slab, ConvertParams::default())
            .unwrap()
            .convert()
            .unwrap();

        let fronts = &converted.fronts;
        let pairs: Vec<(usize, usize)> = converted
            .mesh
            .identifications()
            .iter()
            .map(|id| (id.master, id.servant))
            .collect();
        let expected: Vec<(usize, usize)> = [0, 1, 3]
            .into_iter()
            .map(|f| {
                (
                    fronts.spacetime_vertex(f, 0).unwrap(),
                    fronts.spacetime_vertex(f, 2).unwrap(),
                )
            })
            .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn unrealized_servants_are_skipped() {
        let mut mesh = generators::interval_mesh(0.0, 1.0, 2);
        mesh.add_periodic_pair(0, 2, 4);
        let slab = TentSequence::from_tents(
            &mesh,
            1.0,
            vec![Tent {
                vertex: 0,
                level: 0,
                top_time: 1.0,
            }],
        );
        let mut builder = SpacetimeMeshBuilder::<2>::new();
        // servants not replicated, so vertex 2 is missing from front 1
        let fronts =
            add_vertices(&slab, &PeriodicClosure::default(), 1.0, &mut builder).unwrap();
        add_identifications(&mesh, &fronts, &mut builder);

        let st_mesh = builder.build();
        assert_eq!(
            st_mesh.identifications(),
            &[Identification {
                master: 0,
                servant: 2,
                ident: 5,
                kind: IdentificationKind::Periodic,
            }]
        );
    }
}
