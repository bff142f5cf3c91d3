use crate::digest::{run_digest, run_query, DigestArgs, QueryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hiring_pulse::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "hiring-pulse",
    about = "Serve or print the daily hiring pulse from pipeline and sourcing data",
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
    /// Analyze a request file and print the daily digest
    Digest(DigestArgs),
    /// Route a free-text question to the matching slice of the digest
    Query(QueryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Digest(args) => run_digest(args),
        Command::Query(args) => run_query(args),
    }
}
