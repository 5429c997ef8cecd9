use clap::Parser;
use log::LevelFilter;
use sithres_utils::{ok, AnyResult};

fn main() -> AnyResult {
    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = sithres::Cli::parse_from(wild::args());
    sithres::run(cli)?;
    ok()
}
