//! OBJ mesh writing.

use itertools::Itertools;
use sithres_fmt::mesh::ExportMesh;
use sithres_utils::{ok, AnyResult};
use std::io::Write;

/// Writes the mesh in OBJ line order: every vertex, then every normal, then
/// the grouped faces. Face lines reference both lists 1-based, which is why
/// the blocks must not interleave.
pub fn write_mesh<W: Write>(w: &mut W, mesh: &ExportMesh) -> AnyResult {
    for v in &mesh.vertices {
        writeln!(w, "v {} {} {}", v.x, v.y, v.z)?;
    }
    writeln!(w)?;

    for n in &mesh.normals {
        writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    writeln!(w)?;

    for group in &mesh.groups {
        writeln!(w, "g {}", group.name)?;
        for face in &group.faces {
            writeln!(
                w,
                "f {}",
                face.vertices
                    .iter()
                    .map(|vertex| format!("{vertex}//{}", face.normal))
                    .join(" ")
            )?;
        }
    }
    ok()
}
