use clap::Args;
use log::info;
use sithres_fmt::mat;
use sithres_utils::{ok, AnyResult, AnyhowResultExt};
use std::{fs, fs::File, io::BufWriter, path::PathBuf};

/// Dumps every texture of a material container as a PGM image.
#[derive(Args)]
pub struct MaterialCommand {
    /// Path to the material container.
    pub input: PathBuf,
    /// Output root; `-<index>.pgm` is appended per texture, so `out/tex`
    /// produces `out/tex-0.pgm`, `out/tex-1.pgm` and so on.
    pub out_root: String,
}

impl crate::Command for MaterialCommand {
    fn run(self) -> AnyResult {
        let buffer =
            fs::read(&self.input).otherwise(format!("couldn't read {}", self.input.display()))?;

        let material = mat::read_mat(&buffer)?;
        info!("decoded {} textures", material.textures.len());

        for (index, texture) in material.textures.iter().enumerate() {
            let path = format!("{}-{}.pgm", self.out_root, index);
            let mut writer =
                BufWriter::new(File::create(&path).otherwise(format!("couldn't create {path}"))?);
            crate::exporter::pgm::write_texture(&mut writer, texture)?;
            info!("wrote {path}");
        }
        ok()
    }
}
