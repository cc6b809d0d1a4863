mod config;
mod controller;
mod error;
mod core {
    pub mod preferences;
    pub mod store;
    pub mod template;
}
mod ai {
    pub mod client;
    pub mod prompts;
}
mod auth {
    pub mod gateway;
    pub mod provider;
    pub mod session;
}

use crate::ai::client::{RefinementClient, MODEL_CATALOG};
use crate::auth::gateway::AuthGateway;
use crate::auth::provider::SupabaseProvider;
use crate::config::AppConfig;
use crate::controller::{AppState, AuthView, Controller, RefinementOutcome};
use crate::core::preferences::PreferenceStore;
use crate::core::store::{FileStore, KeyValueStore, MemoryStore};
use crate::core::template::{self, Field, PromptFields, ToolMode};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

#[derive(Parser)]
#[command(name = "prompt-studio", about = "Compose prompts for coding, image and video assistants")]
struct Cli {
    /// Directory holding the local preference store
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Origin and path this app is served from (referer and reset redirect)
    #[arg(long)]
    app_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template once and exit
    Render {
        #[arg(long, default_value = "coding")]
        tool: ToolMode,
        #[arg(long, default_value = "")]
        topic: String,
        #[arg(long, default_value = "")]
        context: String,
        /// Extra fields as name=value, e.g. --set framework=Axum
        #[arg(long = "set", value_parser = parse_assignment)]
        fields: Vec<(Field, String)>,
    },
}

fn parse_assignment(raw: &str) -> Result<(Field, String), String> {
    let (name, value) = raw.split_once('=').ok_or("expected name=value")?;
    Ok((name.parse()?, value.to_string()))
}

const HELP: &str = "\
Commands:
  status                         show current state
  view login|signup|reset        switch auth form
  email <addr> / password <pw>   fill the auth form
  login | signup | reset-password | logout
  refresh                        refresh the session token
  tool coding|image|video        select template
  set <field> [value]            edit a field, or list its choices (see `fields`)
  unset <field>                  clear a field
  fields                         list fields for the current tool
  generate                       render the template
  refine                         rewrite the draft with the configured model
  copy                           print the output for copying
  reset                          clear topic, context and output
  settings [key <k>|model <m>|show|save|clear-key|close]
  models                         list suggested models
  quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::builder().filter_level(log::LevelFilter::Info).parse_default_env().init();

    let cli = Cli::parse();

    if let Some(Command::Render { tool, topic, context, fields: extra }) = cli.command {
        let mut fields = PromptFields::default();
        fields.set(Field::Topic, topic);
        fields.set(Field::Context, context);
        for (field, value) in extra {
            fields.set(field, value);
        }
        println!("{}", template::render(tool, &fields));
        return Ok(());
    }

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(url) = cli.app_url {
        config.app_url = url;
    }

    let store: Arc<dyn KeyValueStore> = match &config.data_dir {
        Some(dir) => {
            let file_store = FileStore::new(dir);
            log::info!("Using local store at {}", file_store.path().display());
            Arc::new(file_store)
        }
        None => {
            log::warn!("No data directory available; preferences last for this run only");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = config.auth.as_ref().map(|auth| {
        Arc::new(AuthGateway::new(
            Arc::new(SupabaseProvider::new(&auth.url, auth.anon_key.clone())),
            store.clone(),
        ))
    });
    let client = RefinementClient::new(config.llm_endpoint.clone(), config.app_url.clone());
    let mut app = Controller::new(gateway, PreferenceStore::new(store), config.app_url.clone());

    println!("✨ Prompt Studio");
    app.boot().await;
    print_status(&app);
    println!("Type `help` for commands.");

    let mut lines = CommandReader::new(BufReader::new(tokio::io::stdin()));
    let mut refinements: JoinSet<RefinementOutcome> = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Could not read from stdin: {e}");
                        break;
                    }
                };
                match handle_line(&mut app, line.trim_end_matches(['\r', '\n']), &client, &mut refinements).await {
                    Flow::Continue => {}
                    Flow::Quit => break,
                }
            }
            Some(change) = app.next_auth_change() => {
                app.handle_auth_change(change);
                print_status(&app);
            }
            Some(joined) = refinements.join_next(), if !refinements.is_empty() => {
                match joined {
                    Ok(outcome) => {
                        if app.finish_refinement(outcome) {
                            print_output(&app);
                        }
                    }
                    Err(e) => log::error!("Refinement task failed: {e}"),
                }
            }
        }
    }

    app.shutdown();
    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

/// Reads stdin line by line, decoding invalid UTF-8 lossily.
/// A partially read line survives a cancelled `next_line`.
struct CommandReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> CommandReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, pending: Vec::new() }
    }

    /// `None` at end of input.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.inner.read_until(b'\n', &mut self.pending).await?;
        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Ok(Some(line))
    }
}

/// Splits off the command word. The remainder is returned untouched so passwords keep their spaces.
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    line.split_once(char::is_whitespace).unwrap_or((line, ""))
}

async fn handle_line(
    app: &mut Controller,
    line: &str,
    client: &RefinementClient,
    refinements: &mut JoinSet<RefinementOutcome>,
) -> Flow {
    let (cmd, raw_rest) = split_command(line);
    let rest = raw_rest.trim();

    match cmd {
        "" => {}
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Flow::Quit,
        "status" => print_status(app),

        "view" => match rest.parse::<AuthView>() {
            Ok(view) => app.set_auth_view(view),
            Err(e) => println!("{e}"),
        },
        "email" => app.auth.email = rest.to_string(),
        "password" => app.auth.password = raw_rest.to_string(),
        "login" => {
            app.sign_in().await;
            print_auth(app);
        }
        "signup" => {
            app.sign_up().await;
            print_auth(app);
        }
        "reset-password" => {
            app.request_password_reset().await;
            print_auth(app);
        }
        "logout" => {
            app.sign_out().await;
            print_status(app);
        }
        "refresh" => {
            app.refresh_session().await;
            print_auth(app);
        }

        "tool" if rest.is_empty() => {
            for tool in ToolMode::ALL {
                let marker = if tool == app.tool() { "*" } else { " " };
                println!(" {marker} {tool}");
            }
        }
        "tool" => match rest.parse::<ToolMode>() {
            Ok(tool) => app.select_tool(tool),
            Err(e) => println!("{e}"),
        },
        "set" | "unset" => {
            let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match name.parse::<Field>() {
                Ok(field) if cmd == "set" && value.trim().is_empty() => print_choices(app, field),
                Ok(field) if cmd == "set" => app.set_field(field, value.trim()),
                Ok(field) => app.set_field(field, ""),
                Err(e) => println!("{e}"),
            }
        }
        "fields" => {
            for field in Field::ALL.into_iter().filter(|f| f.applies_to(app.tool())) {
                println!("  {:<12} {}", field.name(), app.fields.get(field));
                if !field.choices().is_empty() {
                    println!("  {:<12}   ({})", "", field.choices().join(" | "));
                }
            }
        }
        "generate" => {
            app.generate_template();
            print_output(app);
        }
        "refine" => {
            if let Some(pending) = app.begin_refinement() {
                println!("⏳ Refining draft ({} chars)…", pending.draft().chars().count());
                let client = client.clone();
                refinements.spawn(async move { pending.run(&client).await });
            } else {
                print_output(app);
            }
        }
        "copy" => {
            let mut stdout = std::io::stdout();
            app.copy_output(&mut stdout, Instant::now());
            if app.copied_at(Instant::now()) {
                println!("Copied");
            }
        }
        "reset" => {
            if !app.reset_form() {
                println!("A refinement is running; try again when it finishes.");
            }
        }

        "settings" => handle_settings(app, rest),
        "models" => {
            for (id, label) in MODEL_CATALOG {
                println!("  {id:<30} {label}");
            }
        }
        other => println!("Unknown command '{other}'. Type `help`."),
    }
    Flow::Continue
}

fn handle_settings(app: &mut Controller, args: &str) {
    let (sub, value) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    if !app.settings.open && !sub.is_empty() {
        app.open_settings();
    }
    match sub {
        "" => app.open_settings(),
        "key" => app.settings.draft_key = value.trim().to_string(),
        "model" => app.settings.draft_model = value.trim().to_string(),
        "show" => app.settings.show_key = !app.settings.show_key,
        "save" => app.save_settings(Instant::now()),
        "clear-key" => app.clear_key(Instant::now()),
        "close" => {
            app.close_settings();
            return;
        }
        other => {
            println!("Unknown settings action '{other}'");
            return;
        }
    }
    println!("Settings");
    println!("  API key: {}", app.settings.displayed_key());
    println!("  Model:   {}", app.settings.draft_model);
    if let Some(flash) = app.settings.flash_at(Instant::now()) {
        println!("  {flash}");
    }
}

fn print_choices(app: &Controller, field: Field) {
    let current = app.fields.get(field);
    if field.choices().is_empty() {
        println!("{field} is free text (current: {current:?})");
        return;
    }
    println!("Choices for {field} (any other text works too):");
    for choice in field.choices() {
        let marker = if *choice == current { "*" } else { " " };
        println!(" {marker} {choice}");
    }
}

fn print_status(app: &Controller) {
    if app.config_missing() {
        println!("⚠️  Configuration missing: set SUPABASE_URL and SUPABASE_ANON_KEY to enable sign-in.");
    }
    match app.state() {
        AppState::Booting => println!("Starting…"),
        AppState::Unauthenticated(view) => println!("Signed out ({view} form)."),
        AppState::Authenticated(tool) => {
            println!("Signed in as {} | tool: {tool}", app.user_email());
            let pref = app.preference();
            if pref.is_ready() {
                println!("Model: {}", pref.model_id);
            }
        }
    }
}

fn print_auth(app: &Controller) {
    if app.auth.busy {
        println!("Working…");
    }
    if let Some(err) = &app.auth.error {
        println!("❌ {err}");
    }
    if let Some(notice) = &app.auth.notice {
        println!("ℹ️  {notice}");
    }
    print_status(app);
}

fn print_output(app: &Controller) {
    if let Some(err) = app.ai_error() {
        println!("❌ {err}");
    } else if !app.output().is_empty() {
        println!("--------------------------------------------------");
        println!("{}", app.output());
        println!("--------------------------------------------------");
    }
}
