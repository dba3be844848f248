use clap::{Parser, Subcommand};
use functions_relay::cmd::{
    ApproveArgs, EstimateArgs, RequestArgs, ResumeArgs, SimulateArgs, approve, estimate, request,
    resume, simulate,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `app.yaml`.
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the remote computation locally against live APIs.
    Simulate(SimulateArgs),
    /// Prints the current fee estimate for one request.
    Estimate(EstimateArgs),
    /// Stages secrets and submits a paid request. Secrets are sealed with a
    /// local envelope that live DONs cannot open.
    Request(RequestArgs),
    /// Awaits an earlier request, or reconciles unconfirmed broadcasts.
    Resume(ResumeArgs),
    /// Approves the fee spender for the wallet's LINK balance.
    Approve(ApproveArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config_dir = cli.config_dir.as_deref();

    match cli.command {
        Commands::Simulate(args) => simulate::execute(args, config_dir).await?,
        Commands::Estimate(args) => estimate::execute(args, config_dir).await?,
        Commands::Request(args) => request::execute(args, config_dir).await?,
        Commands::Resume(args) => resume::execute(args, config_dir).await?,
        Commands::Approve(args) => approve::execute(args, config_dir).await?,
    }

    Ok(())
}
