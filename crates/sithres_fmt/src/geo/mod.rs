//! Level geometry decoding.
//!
//! A Sith engine level document is text; its `SECTION: GEORESOURCE` region
//! carries the raw geometry — vertex positions, texture coordinates,
//! colormap references and polygonal surfaces. Sector declarations found
//! elsewhere in the document group contiguous surface ranges into the
//! renderable units the exporter emits.

mod read;
pub use read::read_level;

use glam::{Vec2, Vec3};
use smallvec::SmallVec;

/// One `vertex,uv` reference inside a surface's vertex list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    /// Zero-based index into the level's vertex table.
    pub vertex: usize,
    /// Zero-based index into the UV table; -1 marks an untextured slot.
    pub uv: i32,
}

/// A polygonal surface. `adjoin == -1` means the surface faces the playable
/// exterior; any other value links it to the surface it is glued to, which
/// keeps both out of mesh export.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub index: usize,
    pub material: i32,
    pub texture: i32,
    pub adjoin: i32,
    pub vertex_refs: SmallVec<[VertexRef; 4]>,
}

impl Surface {
    pub fn is_exterior(&self) -> bool {
        self.adjoin == -1
    }
}

/// A contiguous run of surfaces forming one renderable group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    pub first_surface: usize,
    pub surface_count: usize,
}

/// Everything decoded from one level document. Immutable once built;
/// consumed by [`crate::mesh::assemble`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelGeometry {
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colormaps: Vec<String>,
    pub surfaces: Vec<Surface>,
    /// One normal per surface, indexed by [`Surface::index`].
    pub normals: Vec<Vec3>,
    pub sectors: Vec<Sector>,
}
