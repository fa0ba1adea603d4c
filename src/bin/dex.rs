//! Command line entry point: builds a customer deck from a template, data
//! files and generated org charts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dex::deck::{DeckBuilder, DeckConfig, DeckRequest, MeetingDate};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dex", version, about = "Assemble a slide deck from a template, data and org charts")]
struct Args {
    /// Deck configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data file or directory; repeat to merge several, later ones winning
    #[arg(short, long = "data-path", required = true)]
    data_path: Vec<PathBuf>,

    /// Template presentation; overrides the configured template
    #[arg(short, long)]
    template_file: Option<PathBuf>,

    /// Directory receiving the deck
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Meeting date: 'today', 'tomorrow' or YYYY-MM-DD
    #[arg(long, default_value = "today")]
    meeting_date: MeetingDate,

    /// Also write each org chart as DOT, SVG and PNG
    #[arg(short, long)]
    save_org_charts: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        },
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> dex::Result<PathBuf> {
    let config = match &args.config {
        Some(path) => DeckConfig::load(path).await?,
        None => DeckConfig::default(),
    };

    let mut request = DeckRequest::new(args.output_dir)
        .with_meeting_date(args.meeting_date)
        .with_save_org_charts(args.save_org_charts);
    request.data_paths = args.data_path;
    request.template_file = args.template_file;

    let output = DeckBuilder::new(config).build(&request).await?;
    Ok(output.deck_path)
}
