//! Georesource section and sector-table extraction.

use super::{LevelGeometry, Sector, Surface, VertexRef};
use crate::text::TextPattern;
use crate::DecodeError;
use glam::{Vec2, Vec3};
use log::warn;
use regex::{Captures, Regex};
use smallvec::SmallVec;

/// One `index: x y z` float triplet row.
const TRIPLET: &str = r"\d+:\s+(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)";
/// One `index: u v` float pair row.
const PAIR: &str = r"\d+:\s+(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)";
/// One numbered colormap filename row.
const COLORMAP: &str = r"\d+:\s+(\d+\w+\.cmp)";
/// One surface row: index, material, two flag words, geometry and lighting
/// modes, texture, adjoin, extra light, vertex count, the vertex list, and
/// the per-vertex intensities (consumed but not retained).
const SURFACE: &str = r"(\d+):\s+(-?\d+)\s+\S+\s+\S+\s+\d+\s+\d+\s+(\d+)\s+(-?\d+)\s+\d+(?:\.\d+)?\s+(\d+)\s+((?:\d+,-?\d+\s+)+)(?:(?:\d+)?\.\d+\s*)+";
/// One `vertex,uv` pair inside a surface's vertex list.
const VERTEX_REF: &str = r"(\d+),(-?\d+)";
/// A sector's surface-range declaration. Uppercase only: the georesource
/// section has a lowercase `surfaces` subsection header that must not match.
const SECTOR: &str = r"SURFACES\s+(\d+)\s+(\d+)";

/// Decodes the georesource section plus the document-wide sector table.
///
/// A missing section is fatal; integrity problems inside individual rows
/// (vertex-count mismatches, unknown subsections) are logged and decoding
/// continues.
pub fn read_level(doc: &str) -> Result<LevelGeometry, DecodeError> {
    let section = georesource_section(doc)?;
    let kind_pattern = Regex::new(r"^\s+(\w+)")?;

    let mut geometry = LevelGeometry::default();
    for block in section.split("World") {
        let Some(kind) = kind_pattern.captures(block).and_then(|c| c.get(1)) else {
            continue;
        };
        match kind.as_str() {
            "vertices" => geometry.vertices = read_triplets(block)?,
            "texture" => geometry.uvs = read_pairs(block)?,
            "Colormaps" => geometry.colormaps = read_colormaps(block)?,
            "surfaces" => {
                geometry.surfaces = read_surfaces(block)?;
                // Each surface row stores its normal in the same positional
                // slot a vertex triplet occupies, so the normals come from a
                // second, independent pass over the same block.
                geometry.normals = read_triplets(block)?;
            }
            other => warn!("no reader for subsection {other}, skipping"),
        }
    }

    geometry.sectors = read_sectors(doc)?;
    log::debug!(
        "georesource: {} vertices, {} uvs, {} surfaces, {} sectors",
        geometry.vertices.len(),
        geometry.uvs.len(),
        geometry.surfaces.len(),
        geometry.sectors.len()
    );
    Ok(geometry)
}

/// Slice of `doc` between the georesource marker and the next section
/// marker, or the end of the document when it is the last section.
fn georesource_section(doc: &str) -> Result<&str, DecodeError> {
    let start = Regex::new(r"(?i)SECTION:\s*GEORESOURCE")?
        .find(doc)
        .ok_or_else(|| DecodeError::SectionNotFound("GEORESOURCE".into()))?;
    let rest = &doc[start.end()..];
    Ok(match Regex::new(r"(?i)SECTION:")?.find(rest) {
        Some(next) => &rest[..next.start()],
        None => rest,
    })
}

fn read_triplets(block: &str) -> Result<Vec<Vec3>, DecodeError> {
    let row = Regex::new(TRIPLET)?;
    let mut out = Vec::new();
    for caps in row.captures_iter(block) {
        out.push(Vec3::new(
            float(&caps, 1, "triplet row")?,
            float(&caps, 2, "triplet row")?,
            float(&caps, 3, "triplet row")?,
        ));
    }
    Ok(out)
}

fn read_pairs(block: &str) -> Result<Vec<Vec2>, DecodeError> {
    let row = Regex::new(PAIR)?;
    let mut out = Vec::new();
    for caps in row.captures_iter(block) {
        out.push(Vec2::new(
            float(&caps, 1, "uv row")?,
            float(&caps, 2, "uv row")?,
        ));
    }
    Ok(out)
}

fn read_colormaps(block: &str) -> Result<Vec<String>, DecodeError> {
    let row = Regex::new(COLORMAP)?;
    Ok(row
        .captures_iter(block)
        .map(|caps| capture(&caps, 1).to_owned())
        .collect())
}

fn read_surfaces(block: &str) -> Result<Vec<Surface>, DecodeError> {
    let vertex_ref = TextPattern::builder(VERTEX_REF)
        .named("vertex")
        .named("uv")
        .build()?;
    let surface = TextPattern::builder(SURFACE)
        .named("index")
        .named("material")
        .named("texture")
        .named("adjoin")
        .named("nverts")
        .nested("vertex_refs", vertex_ref)
        .build()?;

    let mut out = Vec::new();
    for found in surface.matches(block)? {
        let declared: usize = number(found.text("nverts")?, "vertex count")?;

        let mut refs: SmallVec<[VertexRef; 4]> = SmallVec::new();
        for pair in found.nested("vertex_refs")? {
            refs.push(VertexRef {
                vertex: number(pair.text("vertex")?, "vertex index")?,
                uv: number(pair.text("uv")?, "uv index")?,
            });
        }
        if refs.len() != declared {
            warn!(
                "surface {} declares {declared} vertices but lists {}",
                found.text("index")?,
                refs.len()
            );
        }

        out.push(Surface {
            index: number(found.text("index")?, "surface index")?,
            material: number(found.text("material")?, "material ref")?,
            texture: number(found.text("texture")?, "texture ref")?,
            adjoin: number(found.text("adjoin")?, "adjoin index")?,
            vertex_refs: refs,
        });
    }
    Ok(out)
}

fn read_sectors(doc: &str) -> Result<Vec<Sector>, DecodeError> {
    let declaration = Regex::new(SECTOR)?;
    let mut out = Vec::new();
    for caps in declaration.captures_iter(doc) {
        out.push(Sector {
            first_surface: number(capture(&caps, 1), "sector start")?,
            surface_count: number(capture(&caps, 2), "sector count")?,
        });
    }
    Ok(out)
}

fn capture<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map(|m| m.as_str()).unwrap_or("")
}

fn float(caps: &Captures, index: usize, what: &'static str) -> Result<f32, DecodeError> {
    number(capture(caps, index), what)
}

fn number<T: std::str::FromStr>(text: &str, what: &'static str) -> Result<T, DecodeError> {
    text.trim().parse().map_err(|_| DecodeError::BadNumber(what))
}
