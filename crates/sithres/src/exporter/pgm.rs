//! Plain-text PGM image dumps.

use itertools::Itertools;
use sithres_fmt::mat::MatTexture;
use sithres_utils::{ok, AnyResult};
use std::io::Write;

/// Maximum sample value of the 8-bit colormap-indexed grids.
const MAX_SAMPLE: u32 = 255;

/// Writes one texture as a plain (`P2`) PGM: format tag, width, height and
/// maximum sample value each on their own line, then every sample
/// space-separated.
pub fn write_texture<W: Write>(w: &mut W, texture: &MatTexture) -> AnyResult {
    writeln!(w, "P2")?;
    writeln!(w, "{}", texture.size_x)?;
    writeln!(w, "{}", texture.size_y)?;
    writeln!(w, "{MAX_SAMPLE}")?;
    writeln!(
        w,
        "{}",
        texture.pixels.iter().map(|p| p.to_string()).join(" ")
    )?;
    ok()
}
