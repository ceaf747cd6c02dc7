use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use openai_control::{Commands, Container, ContainerConfig, Router};

#[derive(Parser)]
#[command(name = "openai-control")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON options file (prompt, chat_model, max_tokens, top_p, temperature)
    #[arg(long, global = true)]
    options: Option<String>,

    #[arg(long, global = true)]
    model: Option<String>,

    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    #[arg(long, global = true)]
    top_p: Option<f32>,

    #[arg(long, global = true)]
    temperature: Option<f32>,

    #[arg(long, global = true)]
    session_capacity: Option<usize>,

    /// JSON home fixture describing entities and services
    #[arg(long, global = true)]
    home: Option<String>,

    /// Home Assistant base URL, falls back to HASS_URL (token read from HASS_TOKEN)
    #[arg(long, global = true)]
    hass_url: Option<String>,

    /// Entity id exposed to the agent; repeat for more
    #[arg(long = "expose", global = true)]
    expose: Vec<String>,

    #[arg(long, global = true)]
    mock_llm: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let container = Container::new(ContainerConfig {
        options_path: cli.options,
        chat_model: cli.model,
        max_tokens: cli.max_tokens,
        top_p: cli.top_p,
        temperature: cli.temperature,
        session_capacity: cli.session_capacity,
        home_path: cli.home,
        hass_url: cli.hass_url.or_else(|| std::env::var("HASS_URL").ok()),
        exposed_entities: cli.expose,
        mock_llm: cli.mock_llm,
    })
    .await?;

    let output = Router::new(&container).route(cli.command).await?;
    println!("{}", output);

    Ok(())
}
