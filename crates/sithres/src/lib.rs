//! Command line converter for Sith engine game assets.
//!
//! Decodes the engine's proprietary formats and re-emits them as portable
//! ones: the georesource of a level document (`.jkl`) becomes an OBJ mesh,
//! a material container (`.mat`) becomes one plain-text PGM grayscale image
//! per texture.

use clap::{Parser, Subcommand};
use commands::{level::LevelCommand, material::MaterialCommand};
use sithres_utils::{ok, AnyResult};

pub mod commands;
pub mod exporter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Converts a level document into an OBJ mesh
    Level(LevelCommand),
    /// Dumps a material container's textures as PGM images
    Material(MaterialCommand),
}

pub trait Command {
    fn run(self) -> AnyResult;
}

/// Runs the converter as if it was invoked from the command line.
///
/// This function is provided to allow invocation of the tools from library
/// builds.
pub fn run(cli: Cli) -> AnyResult {
    match cli.command {
        CliCommand::Level(c) => c.run()?,
        CliCommand::Material(c) => c.run()?,
    }
    ok()
}
