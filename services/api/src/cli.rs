use crate::demo::{run_demo, DemoArgs};
use crate::report::{run_periods, run_resume, run_score, PeriodsArgs, ResumeArgs, ScoreArgs};
use crate::server;
use charter_score::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Charter Score",
    about = "Score project charters and serve the scoring API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score an item, group, or project over an optional window
    Score(ScoreArgs),
    /// Monthly and cumulative resume for one project
    Resume(ResumeArgs),
    /// List the reporting periods covering a date range
    Periods(PeriodsArgs),
    /// Print a scored sample charter with a delegated child project
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Charter snapshot (JSON) to serve instead of APP_DATA_PATH
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Resume(args) => run_resume(args),
        Command::Periods(args) => run_periods(args),
        Command::Demo(args) => run_demo(args),
    }
}
