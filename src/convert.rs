//! Conversion of a tent-pitched slab into a spacetime mesh.
//!
//! The conversion runs in fixed stages, each consuming the results of the last:
//!
//! 1. every (front, spatial vertex) pair realized by the tents
//!    gets one spacetime vertex ([`FrontTable`]),
//! 2. every tent contributes one volume element per spatial element around its apex,
//!    connecting the apex to the most recent realizations of the element's vertices,
//! 3. facets with only boundary vertices become oriented, region-tagged surface elements,
//! 4. periodic vertex pairs are identified in every front,
//! 5. the mesh topology is finalized,
//! 6. a per-front map from spatial to spacetime degrees of freedom is built ([`DofMap`]).
//!
//! ```
//! # use tentslab::{mesh::generators, tents::{Tent, TentSequence}, convert::*};
//! # fn run() -> Result<(), ConvertError> {
//! let mesh = generators::interval_mesh(0.0, 1.0, 4);
//! let mut slab = TentSequence::new(&mesh, 0.1);
//! slab.push(Tent { vertex: 2, level: 0, top_time: 0.1 });
//!
//! let converted = SlabConverter::<_, 1, 2>::new(&slab, ConvertParams::default())?.convert()?;
//! // one triangle for each segment around vertex 2
//! assert_eq!(converted.mesh.element_count(), 2);
//! # Ok(())
//! # }
//! # run().expect("conversion failed");
//! ```

mod dof_map;
pub use dof_map::DofMap;

mod elements;

mod fronts;
pub use fronts::FrontTable;

mod periodicity;

mod surface;

//

use std::time::Instant;

use crate::{
    periodic::PeriodicClosure,
    spacetime::{SpacetimeMesh, SpacetimeMeshBuilder},
    tents::TentSlab,
};

/// Parameters of a slab conversion.
#[derive(Clone, Copy, Debug)]
pub struct ConvertParams {
    /// Factor applied to the time coordinate of every spacetime vertex.
    /// Default: 1.0.
    ///
    /// Useful for visualizing slabs that are very thin compared to the spatial domain.
    pub time_scale: f64,
    /// Polynomial order of the space the [`DofMap`] is built for.
    /// Default: 1.
    ///
    /// Order 1 maps vertex degrees of freedom only,
    /// order 2 also maps edge degrees of freedom.
    /// Higher orders are not implemented.
    pub order: usize,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            order: 1,
        }
    }
}

/// Error in converting a slab.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// The requested element order is not 1 or 2.
    #[error("Element order {0} is not supported (only 1 and 2 are implemented)")]
    UnsupportedOrder(usize),
    /// The time scale is not a positive finite number.
    #[error("Invalid time scale {0}")]
    InvalidTimeScale(f64),
    /// The spacetime dimension is not one above the spatial dimension.
    #[error("Cannot build a {spacetime}-dimensional spacetime mesh from a {spatial}-dimensional mesh")]
    DimensionMismatch {
        /// Dimension of the spatial mesh.
        spatial: usize,
        /// Requested dimension of the spacetime mesh.
        spacetime: usize,
    },
    /// A tent refers to a vertex that doesn't exist in the spatial mesh.
    #[error("Tent {tent} has apex vertex {vertex} outside of the spatial mesh")]
    TentVertexOutOfRange {
        /// Position of the tent in pitching order.
        tent: usize,
        /// The offending vertex index.
        vertex: usize,
    },
    /// A tent's level is not below the slab's layer count.
    #[error("Tent {tent} has level {level} but the slab only has {layers} layers")]
    TentLevelOutOfRange {
        /// Position of the tent in pitching order.
        tent: usize,
        /// The offending level.
        level: usize,
        /// Number of layers reported by the slab.
        layers: usize,
    },
    /// The same spatial vertex was realized twice in one front.
    #[error("Vertex {vertex} is realized more than once in front {front}")]
    DuplicateRealization {
        /// Spatial vertex index.
        vertex: usize,
        /// Front index.
        front: usize,
    },
    /// A vertex has no realization in any front before the given one.
    /// This means the tents are not in a causally valid order.
    #[error("Vertex {vertex} has no realization before front {front}")]
    MissingPriorFront {
        /// Spatial vertex index.
        vertex: usize,
        /// Front index.
        front: usize,
    },
    /// A vertex expected in a front has no realization there.
    #[error("Vertex {vertex} is not realized in front {front}")]
    UnrealizedVertex {
        /// Spatial vertex index.
        vertex: usize,
        /// Front index.
        front: usize,
    },
    /// Two spacetime vertices expected to share an edge don't.
    #[error("No spacetime edge between vertices {0} and {1}")]
    MissingEdge(usize, usize),
}

/// Converter from a tent-pitched slab to a spacetime mesh.
///
/// `DIM` is the dimension of the spatial mesh
/// and `ST_DIM` the dimension of the resulting spacetime mesh,
/// which must be `DIM + 1`.
#[derive(Clone, Copy, Debug)]
pub struct SlabConverter<'a, S, const DIM: usize, const ST_DIM: usize> {
    slab: &'a S,
    params: ConvertParams,
}

/// Everything produced by a slab conversion.
#[derive(Clone, Debug)]
pub struct ConvertedSlab<const ST_DIM: usize> {
    /// The spacetime mesh.
    pub mesh: SpacetimeMesh<ST_DIM>,
    /// Correspondence between (front, spatial vertex) pairs and spacetime vertices.
    pub fronts: FrontTable,
    /// Map from spatial to spacetime degrees of freedom for each front.
    pub dof_map: DofMap,
}

impl<'a, S, const DIM: usize, const ST_DIM: usize> SlabConverter<'a, S, DIM, ST_DIM>
where
    S: TentSlab<DIM>,
{
    /// Create a converter for a slab, validating the parameters.
    pub fn new(slab: &'a S, params: ConvertParams) -> Result<Self, ConvertError> {
        if ST_DIM != DIM + 1 {
            return Err(ConvertError::DimensionMismatch {
                spatial: DIM,
                spacetime: ST_DIM,
            });
        }
        if !matches!(params.order, 1 | 2) {
            return Err(ConvertError::UnsupportedOrder(params.order));
        }
        if !(params.time_scale.is_finite() && params.time_scale > 0.0) {
            return Err(ConvertError::InvalidTimeScale(params.time_scale));
        }
        Ok(Self { slab, params })
    }

    /// Run the conversion.
    pub fn convert(self) -> Result<ConvertedSlab<ST_DIM>, ConvertError> {
        let mesh = self.slab.mesh();
        let begin = Instant::now();
        let mut builder = SpacetimeMeshBuilder::<ST_DIM>::new();

        let start = Instant::now();
        let closure = PeriodicClosure::new(mesh.periodic_pairs());
        log::debug!("{} periodic masters", closure.master_count());
        let fronts = fronts::add_vertices(self.slab, &closure, self.params.time_scale, &mut builder)?;
        log::info!("add vertices: {:.5} s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        elements::add_volume_elements(mesh, &fronts, &mut builder)?;
        log::info!("add volume elements: {:.5} s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        surface::add_surface_elements(mesh, &fronts, &mut builder);
        log::info!("add surface elements: {:.5} s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        periodicity::add_identifications(mesh, &fronts, &mut builder);
        log::info!("handle periodicity: {:.5} s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        let st_mesh = builder.build();
        log::info!("build spacetime mesh: {:.5} s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        let dof_map = dof_map::build_dof_map(mesh, &fronts, &st_mesh, self.params.order)?;
        log::info!("make index map: {:.5} s", start.elapsed().as_secs_f64());

        log::info!(
            "{} verts, {} vol elems, {} surf elems in {:.5} s",
            st_mesh.vertex_count(),
            st_mesh.element_count(),
            st_mesh.surface_elements().len(),
            begin.elapsed().as_secs_f64(),
        );

        Ok(ConvertedSlab {
            mesh: st_mesh,
            fronts,
            dof_map,
        })
    }
}
