use crate::demo::{run_amendment_guide, run_demo, DemoArgs, GuideArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use filing_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "HVUT Filing Desk",
    about = "Run the filing back-office service or exercise its workflows from the command line",
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
    /// Amendment-processing reference material for agents
    Amendments {
        #[command(subcommand)]
        command: AmendmentsCommand,
    },
    /// Run an end-to-end CLI demo covering rejection, response, and issuance
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AmendmentsCommand {
    /// Print the processing guide and rejection catalog
    Guide(GuideArgs),
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
        Command::Amendments {
            command: AmendmentsCommand::Guide(args),
        } => run_amendment_guide(args),
        Command::Demo(args) => run_demo(args),
    }
}
