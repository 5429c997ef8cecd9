use clap::Args;
use log::info;
use sithres_fmt::{geo, mesh};
use sithres_utils::{ok, AnyResult, AnyhowResultExt};
use std::{fs, fs::File, io::BufWriter, path::PathBuf};

/// Converts a level document (`.jkl`) into an OBJ mesh.
#[derive(Args)]
pub struct LevelCommand {
    /// Path to the level document.
    pub input: PathBuf,
    /// Path of the OBJ file to write.
    pub output: PathBuf,
}

impl crate::Command for LevelCommand {
    fn run(self) -> AnyResult {
        let document = fs::read_to_string(&self.input)
            .otherwise(format!("couldn't read {}", self.input.display()))?;

        let geometry = geo::read_level(&document)?;
        info!(
            "decoded {} vertices, {} surfaces, {} sectors",
            geometry.vertices.len(),
            geometry.surfaces.len(),
            geometry.sectors.len()
        );

        let mesh = mesh::assemble(&geometry);
        let mut writer = BufWriter::new(
            File::create(&self.output)
                .otherwise(format!("couldn't create {}", self.output.display()))?,
        );
        crate::exporter::obj::write_mesh(&mut writer, &mesh)?;

        info!("wrote {}", self.output.display());
        ok()
    }
}
