mod app;
mod commands;
mod prompt;

use clap::Parser;
use docweave_engine::FileKind;

use crate::app::{Cli, Command};
use crate::commands::Session;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Progress on stderr; --verbose enables debug, --quiet keeps warnings; RUST_LOG overrides
    let level = if cli.global.verbose {
        log::LevelFilter::Debug
    } else if cli.global.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let mut session = Session::open(&cli.global)?;

    match &cli.command {
        Command::Split {
            from_file,
            legacy_base_dir,
            category_prefix,
            conditions,
            timestamp,
        } => commands::split(
            &mut session,
            from_file,
            legacy_base_dir.as_deref(),
            category_prefix.as_deref(),
            conditions.as_deref(),
            *timestamp,
        ),
        Command::Resolve { file, conditions } => {
            commands::resolve(&mut session, file, conditions.as_deref())
        }
        Command::Update(args) => commands::update(&mut session, args),
        Command::Orphan { category_list } => commands::orphan(&session, category_list.as_deref()),
        Command::Csv { file, cols } => commands::csv(&mut session, file, cols.as_deref()),
        Command::Assembly(args) => commands::create(&session, FileKind::Assembly, args),
        Command::Procedure(args) => commands::create(&session, FileKind::Procedure, args),
        Command::Concept(args) => commands::create(&session, FileKind::Concept, args),
        Command::Reference(args) => commands::create(&session, FileKind::Reference, args),
    }
}
