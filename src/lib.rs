//! Conversion of tent-pitched spacetime slabs into unstructured meshes
//! one dimension higher than the spatial mesh.
//!
//! A tent-pitching algorithm advances a spatial mesh in time
//! one vertex at a time, each step a "tent" over the elements around the vertex.
//! This crate takes the resulting sequence of tents ([`tents`])
//! and builds a single spacetime mesh out of them ([`convert`]):
//! line meshes become triangle meshes, triangle meshes become tetrahedral meshes.
//! The result carries oriented, region-tagged boundary facets,
//! periodic identifications extended to every time front,
//! and a map from each front's degrees of freedom into the spacetime mesh
//! for reading time slices of fields defined on it.
//!
//! ```
//! use tentslab::{convert::*, mesh::generators, tents::layered_tents};
//!
//! let mesh = generators::rectangle_mesh(
//!     tentslab::Vec2::new(0.0, 0.0),
//!     tentslab::Vec2::new(1.0, 1.0),
//!     4,
//!     4,
//! );
//! let slab = layered_tents(&mesh, 0.1, 2);
//! let converted = SlabConverter::<_, 2, 3>::new(&slab, ConvertParams::default())
//!     .and_then(|conv| conv.convert())
//!     .expect("causal slab");
//! assert_eq!(converted.mesh.regions().last().map(String::as_str), Some("final"));
//! ```

#![warn(missing_docs)]

pub mod mesh;
#[doc(inline)]
pub use mesh::{BoundaryRegion, SimplicialMesh};

pub mod periodic;
#[doc(inline)]
pub use periodic::{PeriodicClosure, PeriodicPair};

pub mod tents;
#[doc(inline)]
pub use tents::{Tent, TentSequence, TentSlab};

pub mod spacetime;
#[doc(inline)]
pub use spacetime::{Identification, IdentificationKind, SpacetimeMesh, SurfaceElement};

pub mod convert;
#[doc(inline)]
pub use convert::{ConvertError, ConvertParams, ConvertedSlab, DofMap, FrontTable, SlabConverter};

pub mod gmsh;

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 1D `nalgebra` vector.
pub type Vec1 = na::Vector1<f64>;
/// Type alias for a 2D `nalgebra` vector.
pub type Vec2 = na::Vector2<f64>;
/// Type alias for a 3D `nalgebra` vector.
pub type Vec3 = na::Vector3<f64>;
/// Type alias for a 4D `nalgebra` vector.
pub type Vec4 = na::Vector4<f64>;
