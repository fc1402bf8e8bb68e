use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flex", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Invert a target energy into a firm capacity for one demand file
    Capacity {
        /// Demand table (CSV or Parquet)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Energy above firm capacity to allow (MWh)
        #[arg(long)]
        target_mwh: f64,
        #[command(flatten)]
        solver: SolverArgs,
        #[command(flatten)]
        columns: ColumnArgs,
        /// Write the statistics as JSON here
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Build competition documents for one substation
    Competitions {
        /// Demand table (CSV or Parquet)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Substation name; defaults to the file stem
        #[arg(long)]
        site: Option<String>,
        /// Known firm capacity (MW); skips the inversion
        #[arg(long, conflicts_with = "target_mwh")]
        capacity: Option<f64>,
        /// Target energy above firm capacity (MWh)
        #[arg(long)]
        target_mwh: Option<f64>,
        /// Analysis config (YAML or JSON) supplying defaults
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        #[command(flatten)]
        solver: SolverArgs,
        #[command(flatten)]
        columns: ColumnArgs,
        #[command(flatten)]
        competition: CompetitionArgs,
        /// Output directory
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
    },
    /// Analyse every configured substation in parallel
    Batch {
        /// Analysis config (YAML or JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Combined dataset with a substation name column
        #[arg(long, value_hint = ValueHint::FilePath)]
        combined: Option<PathBuf>,
        /// CSV of `Site,Firm_Capacity_MW`
        #[arg(long, value_hint = ValueHint::FilePath)]
        capacity_overrides: Option<PathBuf>,
        /// CSV of `Site,Target_MWh`
        #[arg(long, value_hint = ValueHint::FilePath)]
        target_overrides: Option<PathBuf>,
        /// Worker threads (0 = one per CPU)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Re-run sites that already have results
        #[arg(long)]
        force: bool,
        /// Output root; overrides `output.base_dir`
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
    },
    /// Optional competition fields
    Fields {
        #[command(subcommand)]
        command: FieldsCommands,
    },
    /// Qualification and bidding dates for a financial year
    Schedule {
        /// Financial year, e.g. 2025/26
        financial_year: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FieldsCommands {
    /// List every optional field with its level and standard-set membership
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write a field chooser template (JSON)
    Template {
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SolverArgs {
    /// Energy accounting rule: peak_based or above_capacity
    #[arg(long)]
    pub method: Option<String>,
    /// Bisection tolerance as a fraction of peak demand
    #[arg(long)]
    pub tolerance: Option<f64>,
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Sampling interval in hours; inferred when omitted
    #[arg(long)]
    pub interval_hours: Option<f64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ColumnArgs {
    #[arg(long)]
    pub timestamp_column: Option<String>,
    #[arg(long)]
    pub demand_column: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CompetitionArgs {
    #[arg(long)]
    pub licence_area: Option<String>,
    /// Nominal voltage in kV, or HV
    #[arg(long)]
    pub nominal_voltage: Option<String>,
    /// Split windows into pieces of this many minutes
    #[arg(long)]
    pub procurement_minutes: Option<i64>,
    /// Keep each window whole
    #[arg(long, conflicts_with = "procurement_minutes")]
    pub no_split: bool,
    /// One service period per day instead of per month
    #[arg(long)]
    pub daily: bool,
    /// Take dates from this financial year's schedule, e.g. 2025/26
    #[arg(long)]
    pub financial_year: Option<String>,
    /// required_only, standard or custom
    #[arg(long)]
    pub config_mode: Option<String>,
    /// Comma separated optional fields for custom mode
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,
    /// Move demand onto this year first
    #[arg(long)]
    pub service_year: Option<i32>,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
