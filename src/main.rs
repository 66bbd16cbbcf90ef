use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use folio::{cli, config, error, spotify::DEFAULT_RECENT_LIMIT};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP backend
    Serve,

    /// Link a Spotify account through the running backend
    Login(LoginOptions),

    /// Show whether a user is logged in to Spotify
    Status(UserOptions),

    /// Follow what a user is listening to
    Watch(HistoryOptions),

    /// List recently played tracks
    Recent(HistoryOptions),

    /// Show the League of Legends profile of a Riot ID
    Stats(StatsOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    /// User id to store the tokens under; defaults to the Spotify account id
    #[clap(long)]
    pub state: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct UserOptions {
    pub user_id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryOptions {
    pub user_id: String,

    /// Number of recently played tracks to show (1-50)
    #[clap(long, default_value_t = DEFAULT_RECENT_LIMIT)]
    pub limit: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct StatsOptions {
    /// Riot game name, e.g. `Faker`
    pub game_name: String,
    /// Riot tag line without the `#`, e.g. `KR1`
    pub tag: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("folio=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve().await,
        Command::Login(opt) => cli::login(opt.state).await,
        Command::Status(opt) => cli::status(opt.user_id).await,
        Command::Watch(opt) => cli::watch(opt.user_id, opt.limit).await,
        Command::Recent(opt) => cli::recent(opt.user_id, opt.limit).await,
        Command::Stats(opt) => cli::stats(opt.game_name, opt.tag).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
