//! Mesh assembly from decoded level geometry.
//!
//! Turns a [`LevelGeometry`] into the ordered lists an OBJ-style exporter
//! needs: a deduplicated vertex table in first-seen order over exterior
//! surfaces, one normal per exported face, and per-sector face groups
//! carrying 1-based vertex and normal references.

use crate::geo::{LevelGeometry, Sector, Surface};
use ahash::AHashMap;
use glam::Vec3;
use log::warn;
use smallvec::SmallVec;

/// One exported face: remapped 1-based vertex indices plus the face's
/// 1-based normal reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshFace {
    pub vertices: SmallVec<[usize; 4]>,
    pub normal: usize,
}

/// A named run of faces, one group per sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshGroup {
    pub name: String,
    pub faces: Vec<MeshFace>,
}

/// Assembled export mesh. `vertices[i]` is referenced from face lines as
/// `i + 1`; `normals` holds one entry per exterior surface in table order
/// and is referenced the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub groups: Vec<MeshGroup>,
}

/// Builds the export mesh. Deterministic: the same geometry always yields
/// the same mesh, vertex order included.
pub fn assemble(geometry: &LevelGeometry) -> ExportMesh {
    // exterior surfaces only; adjoining surfaces are interior seams
    let exterior: Vec<(usize, &Surface)> = geometry
        .surfaces
        .iter()
        .enumerate()
        .filter(|(_, surface)| surface.is_exterior())
        .collect();

    // the first-seen walk over exterior refs defines the export vertex order
    let mut remap: AHashMap<usize, usize> = AHashMap::with_capacity(geometry.vertices.len());
    let mut vertices = Vec::new();
    for (_, surface) in &exterior {
        for vref in &surface.vertex_refs {
            if !remap.contains_key(&vref.vertex) {
                remap.insert(vref.vertex, vertices.len() + 1); // face lines are 1-based
                vertices.push(lookup(&geometry.vertices, vref.vertex, "vertex"));
            }
        }
    }

    // normal numbering runs over the whole exterior set and never resets
    // per sector
    let mut exterior_order: AHashMap<usize, usize> = AHashMap::with_capacity(exterior.len());
    let mut normals = Vec::with_capacity(exterior.len());
    for (emitted, (position, surface)) in exterior.iter().enumerate() {
        exterior_order.insert(*position, emitted + 1);
        normals.push(lookup(&geometry.normals, surface.index, "normal"));
    }

    let fallback;
    let sectors: &[Sector] = if geometry.sectors.is_empty() {
        warn!("document declares no sectors, exporting a single group");
        fallback = [Sector {
            first_surface: 0,
            surface_count: geometry.surfaces.len(),
        }];
        &fallback
    } else {
        &geometry.sectors
    };

    let mut groups = Vec::with_capacity(sectors.len());
    for (ordinal, sector) in sectors.iter().enumerate() {
        // ranges are clamped to the surface table, never walked past it
        let start = sector.first_surface.min(geometry.surfaces.len());
        let end = sector
            .first_surface
            .saturating_add(sector.surface_count)
            .min(geometry.surfaces.len());

        let mut faces = Vec::new();
        for position in start..end {
            let surface = &geometry.surfaces[position];
            if !surface.is_exterior() {
                continue;
            }
            let Some(&normal) = exterior_order.get(&position) else {
                continue;
            };
            faces.push(MeshFace {
                vertices: surface
                    .vertex_refs
                    .iter()
                    .filter_map(|vref| remap.get(&vref.vertex).copied())
                    .collect(),
                normal,
            });
        }
        groups.push(MeshGroup {
            name: format!("sector_{ordinal}"),
            faces,
        });
    }

    ExportMesh {
        vertices,
        normals,
        groups,
    }
}

fn lookup(table: &[Vec3], index: usize, what: &str) -> Vec3 {
    match table.get(index) {
        Some(v) => *v,
        None => {
            warn!(
                "{what} index {index} is outside the table ({} entries), using zero",
                table.len()
            );
            Vec3::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::VertexRef;

    fn surface(index: usize, adjoin: i32, refs: &[usize]) -> Surface {
        Surface {
            index,
            material: 0,
            texture: 0,
            adjoin,
            vertex_refs: refs
                .iter()
                .map(|&vertex| VertexRef { vertex, uv: 0 })
                .collect(),
        }
    }

    fn geometry(surfaces: Vec<Surface>, sectors: Vec<Sector>) -> LevelGeometry {
        let max_ref = surfaces
            .iter()
            .flat_map(|s| s.vertex_refs.iter())
            .map(|r| r.vertex)
            .max()
            .unwrap_or(0);
        LevelGeometry {
            vertices: (0..=max_ref).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
            uvs: vec![],
            colormaps: vec![],
            normals: (0..surfaces.len())
                .map(|i| Vec3::new(0.0, i as f32, 1.0))
                .collect(),
            surfaces,
            sectors,
        }
    }

    #[test]
    fn first_seen_dedup_and_remap() {
        // two exterior faces sharing vertices, one adjoining duplicate
        let geometry = geometry(
            vec![
                surface(0, -1, &[5, 2, 7]),
                surface(1, -1, &[2, 7, 9]),
                surface(2, 0, &[5, 2, 7]),
            ],
            vec![Sector {
                first_surface: 0,
                surface_count: 3,
            }],
        );
        let mesh = assemble(&geometry);

        // export order is first-seen among exterior faces: 5, 2, 7, 9
        assert_eq!(
            mesh.vertices,
            vec![
                Vec3::new(5.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(7.0, 0.0, 0.0),
                Vec3::new(9.0, 0.0, 0.0),
            ]
        );

        let faces = &mesh.groups[0].faces;
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].vertices.as_slice(), &[1, 2, 3]);
        assert_eq!(faces[0].normal, 1);
        assert_eq!(faces[1].vertices.as_slice(), &[2, 3, 4]);
        assert_eq!(faces[1].normal, 2);

        // the adjoining face contributed neither vertices nor normals
        assert_eq!(mesh.normals.len(), 2);
    }

    #[test]
    fn adjoining_faces_never_export_regardless_of_sector() {
        let geometry = geometry(
            vec![surface(0, 3, &[0, 1, 2]), surface(1, 0, &[0, 1, 2])],
            vec![Sector {
                first_surface: 0,
                surface_count: 2,
            }],
        );
        let mesh = assemble(&geometry);
        assert!(mesh.vertices.is_empty());
        assert!(mesh.normals.is_empty());
        assert!(mesh.groups[0].faces.is_empty());
    }

    #[test]
    fn assembly_is_idempotent() {
        let geometry = geometry(
            vec![
                surface(0, -1, &[3, 1, 4]),
                surface(1, -1, &[1, 5, 9]),
                surface(2, -1, &[2, 6, 5]),
            ],
            vec![Sector {
                first_surface: 0,
                surface_count: 3,
            }],
        );
        assert_eq!(assemble(&geometry), assemble(&geometry));
    }

    #[test]
    fn normal_numbering_is_global_not_per_sector() {
        // sector 1 starts after an adjoining face, so its first face is the
        // second exterior face overall and must reference normal 2
        let geometry = geometry(
            vec![
                surface(0, -1, &[0, 1, 2]),
                surface(1, 4, &[0, 1, 2]),
                surface(2, -1, &[1, 2, 3]),
            ],
            vec![
                Sector {
                    first_surface: 0,
                    surface_count: 2,
                },
                Sector {
                    first_surface: 2,
                    surface_count: 1,
                },
            ],
        );
        let mesh = assemble(&geometry);

        assert_eq!(mesh.groups[0].faces.len(), 1);
        assert_eq!(mesh.groups[0].faces[0].normal, 1);
        assert_eq!(mesh.groups[1].faces.len(), 1);
        assert_eq!(mesh.groups[1].faces[0].normal, 2);
    }

    #[test]
    fn oversized_sector_ranges_are_clamped() {
        let geometry = geometry(
            vec![surface(0, -1, &[0, 1, 2]), surface(1, -1, &[1, 2, 3])],
            vec![
                Sector {
                    first_surface: 1,
                    surface_count: 100,
                },
                Sector {
                    first_surface: 50,
                    surface_count: 2,
                },
            ],
        );
        let mesh = assemble(&geometry);

        assert_eq!(mesh.groups[0].faces.len(), 1);
        assert_eq!(mesh.groups[0].faces[0].normal, 2);
        assert!(mesh.groups[1].faces.is_empty());
    }

    #[test]
    fn missing_sectors_synthesize_a_full_range_group() {
        let geometry = geometry(
            vec![surface(0, -1, &[0, 1, 2]), surface(1, -1, &[2, 3, 4])],
            vec![],
        );
        let mesh = assemble(&geometry);
        assert_eq!(mesh.groups.len(), 1);
        assert_eq!(mesh.groups[0].name, "sector_0");
        assert_eq!(mesh.groups[0].faces.len(), 2);
    }

    #[test]
    fn out_of_range_references_fall_back_to_zero() {
        let mut geometry = geometry(vec![surface(0, -1, &[1, 2])], vec![]);
        geometry.vertices.truncate(2); // ref 2 now dangles
        geometry.normals.clear();
        let mesh = assemble(&geometry);

        assert_eq!(mesh.vertices, vec![Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO]);
        assert_eq!(mesh.normals, vec![Vec3::ZERO]);
    }
}
