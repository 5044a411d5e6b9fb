use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::get_styles;
use pezzottify_subscriptions::catalog::{load_catalog_file, SqliteCatalogStore};
use pezzottify_subscriptions::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_subscriptions::service::SUBSCRIBED_MESSAGE;
use pezzottify_subscriptions::{Identity, MusicService};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding user.db, catalog.db and subscriptions.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Base URL of the cover images.
    #[clap(long)]
    pub image_base_url: Option<String>,

    /// Bucket name, used to build the image base URL when none is given.
    #[clap(long)]
    pub image_bucket: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            image_base_url: self.image_base_url.clone(),
            image_bucket: self.image_bucket.clone(),
        }
    }
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a new identity.
    Register {
        email: String,
        username: String,
        password: String,
    },

    /// Logs in, following commands act on behalf of this identity.
    Login { email: String, password: String },

    Logout,

    /// Shows the logged in identity.
    Whoami,

    /// Searches the catalog, at least one criteria is required.
    Query {
        #[clap(long, default_value = "")]
        title: String,
        #[clap(long, default_value = "")]
        artist: String,
        #[clap(long, default_value = "")]
        year: String,
    },

    /// Subscribes to a catalog entry.
    Subscribe { title: String, artist: String },

    /// Removes a subscription, nothing happens if there is none.
    Unsubscribe { title: String, artist: String },

    /// Lists the subscriptions of the logged in identity.
    List,

    /// Imports a {"songs": [...]} JSON document into the catalog.
    ImportCatalog {
        #[clap(value_parser = parse_path)]
        path: PathBuf,
    },

    /// Shows the paths of the databases in use.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

struct Session {
    service: MusicService,
    config: AppConfig,
    identity: Option<Identity>,
}

fn print_json<T: Serialize>(value: &T) -> CommandExecutionResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            CommandExecutionResult::Ok
        }
        Err(err) => CommandExecutionResult::Error(format!("{}", err)),
    }
}

fn execute_command(line: String, session: &mut Session) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    let command = match cli {
        Ok(cli) => cli.command,
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            return CommandExecutionResult::Ok;
        }
    };

    match command {
        InnerCommand::Register {
            email,
            username,
            password,
        } => match session.service.register(&email, &username, &password) {
            Ok(identity) => print_json(&identity),
            Err(err) => CommandExecutionResult::Error(format!("{}", err)),
        },
        InnerCommand::Login { email, password } => {
            match session.service.authenticate(&email, &password) {
                Ok(identity) => {
                    println!("Welcome, {}!", identity.username);
                    session.identity = Some(identity);
                    CommandExecutionResult::Ok
                }
                Err(err) => CommandExecutionResult::Error(format!("{}", err)),
            }
        }
        InnerCommand::Logout => {
            session.identity = None;
            CommandExecutionResult::Ok
        }
        InnerCommand::Whoami => match &session.identity {
            Some(identity) => print_json(identity),
            None => {
                println!("Not logged in.");
                CommandExecutionResult::Ok
            }
        },
        InnerCommand::Query {
            title,
            artist,
            year,
        } => match session.service.query_music(
            Some(title.as_str()),
            Some(artist.as_str()),
            Some(year.as_str()),
        ) {
            Ok(outcome) => print_json(&outcome),
            Err(err) => CommandExecutionResult::Error(format!("{}", err)),
        },
        InnerCommand::Subscribe { title, artist } => {
            let Some(identity) = &session.identity else {
                return not_logged_in();
            };
            match session.service.subscribe(identity, &title, &artist) {
                Ok(subscriptions) => {
                    println!("{}", SUBSCRIBED_MESSAGE);
                    print_json(&subscriptions)
                }
                Err(err) => CommandExecutionResult::Error(format!("{}", err)),
            }
        }
        InnerCommand::Unsubscribe { title, artist } => {
            let Some(identity) = &session.identity else {
                return not_logged_in();
            };
            match session.service.unsubscribe(identity, &title, &artist) {
                Ok(()) => CommandExecutionResult::Ok,
                Err(err) => CommandExecutionResult::Error(format!("{}", err)),
            }
        }
        InnerCommand::List => {
            let Some(identity) = &session.identity else {
                return not_logged_in();
            };
            match session.service.list_subscriptions(identity) {
                Ok(subscriptions) => print_json(&subscriptions),
                Err(err) => CommandExecutionResult::Error(format!("{}", err)),
            }
        }
        InnerCommand::ImportCatalog { path } => match import_catalog(&session.config, &path) {
            Ok(count) => {
                println!("Imported {} catalog entries.", count);
                CommandExecutionResult::Ok
            }
            Err(err) => CommandExecutionResult::Error(format!("{:#}", err)),
        },
        InnerCommand::Where => {
            println!("{}", session.config.user_db_path().display());
            println!("{}", session.config.catalog_db_path().display());
            println!("{}", session.config.subscriptions_db_path().display());
            CommandExecutionResult::Ok
        }
        InnerCommand::Exit => CommandExecutionResult::Exit,
    }
}

fn not_logged_in() -> CommandExecutionResult {
    CommandExecutionResult::Error("Please login first.".to_string())
}

fn import_catalog(config: &AppConfig, path: &std::path::Path) -> Result<usize> {
    let entries = load_catalog_file(path)?;
    let store = SqliteCatalogStore::new(config.catalog_db_path(), &config.tables.music)?;
    store.upsert_entries(&entries)
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let cli_args = CliArgs::parse();
    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let service = MusicService::open(&config)?;
    let mut session = Session {
        service,
        config,
        identity: None,
    };

    InnerCli::command().print_long_help()?;

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(rl_config)?;
    rl.set_helper(Some(MyHelper::new()));

    loop {
        let readline = rl.readline(PROMPT);

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &mut session) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
