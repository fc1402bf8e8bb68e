use clap::Parser;
use flex_cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::batch::BatchRequest;
use commands::competitions::CompetitionsRequest;

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Capacity {
            input,
            target_mwh,
            solver,
            columns,
            out,
        } => commands::capacity::handle(input, *target_mwh, solver, columns, out.as_deref()),
        Commands::Competitions {
            input,
            site,
            capacity,
            target_mwh,
            config,
            solver,
            columns,
            competition,
            out,
        } => commands::competitions::handle(&CompetitionsRequest {
            input,
            site: site.as_deref(),
            capacity: *capacity,
            target_mwh: *target_mwh,
            config: config.as_deref(),
            solver,
            columns,
            competition,
            out,
        }),
        Commands::Batch {
            config,
            combined,
            capacity_overrides,
            target_overrides,
            threads,
            force,
            out,
        } => commands::batch::handle(&BatchRequest {
            config,
            combined: combined.as_deref(),
            capacity_overrides: capacity_overrides.as_deref(),
            target_overrides: target_overrides.as_deref(),
            threads: *threads,
            force: *force,
            out: out.as_deref(),
        }),
        Commands::Fields { command } => commands::fields::handle(command),
        Commands::Schedule {
            financial_year,
            format,
        } => commands::schedule::handle(financial_year, *format),
        Commands::Completions { shell, out } => commands::completions::handle(*shell, out.as_deref()),
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run(&cli) {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
