mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Workspace;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries JSON results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let ws = Workspace::open(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Infer {
            image,
            site,
            supervisor,
            no_record,
        } => commands::infer::run(&ws, &image, site, supervisor, !no_record),
        Commands::Batch { images } => commands::batch::run(&ws, &images),
        Commands::Record { file } => commands::record::run(&ws, file.as_deref()),
        Commands::History {
            filter,
            limit,
            offset,
        } => commands::history::run(&ws, &filter, limit.as_deref(), offset.as_deref()),
        Commands::Delete { id } => commands::delete::run(&ws, &id),
        Commands::Stats {
            period,
            site,
            supervisor,
        } => commands::stats::run(&ws, &period, site, supervisor),
        Commands::Export {
            format,
            filter,
            output,
            stdout,
        } => commands::export::run(&ws, &format, &filter, output.as_deref(), stdout),
        Commands::Validate { file } => commands::validate::run(&ws, &file),
        Commands::Health => commands::health::run(&ws),
    }
}
