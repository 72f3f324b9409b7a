mod auth;
mod bubble;
mod client;
mod config;
mod dates;
mod gateway;
mod layout;
#[cfg(test)]
mod mock_gateway;
mod output;
mod resolver;
mod session;
mod style;

use std::error::Error;
use std::io::{self, Read};

use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::AuthStore;
use crate::client::{ClientError, MessagingClient, User};
use crate::config::Config;
use crate::gateway::GatewayClient;
use crate::output::{ChatTable, MessageListOutput, SendOutput};
use crate::resolver::ResolveError;
use crate::session::Session;
use crate::style::{Painter, Style};

const SENT: Style = Style::new().bold().fg(170, 235, 180);
const CONVERSATION_HEADER: Style = Style::new().bold().fg(180, 220, 255);
const FOOTER: Style = Style::new().dim().fg(170, 170, 170);

const NOT_FOUND_HINT: &str = "Make sure the username or phone number is correct.";

#[derive(Parser)]
#[command(
    name = "telegram",
    version,
    about = "Telegram from the terminal",
    after_help = "Examples:\n  telegram login\n  telegram list\n  telegram list 20 --json\n  telegram read @alice\n  telegram read \"Alice Young\" 30\n  telegram send @alice \"See you at 6\"\n  telegram send +15559998888 running late\n  echo \"deploy done\" | telegram send -100123456789 --stdin\n\nRecipient formats:\n  @username      exact or partial username\n  +15551230000   phone number, full or trailing digits\n  -100123456789  chat or channel id\n  Alice          display name, full or partial"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, global = true, action = ArgAction::SetTrue, help = "Log progress to stderr")]
    verbose: bool,

    #[arg(long, global = true, help = "Output JSON instead of formatted text")]
    json: bool,

    #[arg(long, global = true, help = "Disable colors (also via NO_COLOR)")]
    no_color: bool,
}

impl Cli {
    /// `-v` typed after the message words still means verbose.
    fn lift_verbose_flags(&mut self) {
        if let Command::Send(args) = &mut self.command {
            let before = args.message.len();
            args.message.retain(|word| word != "-v" && word != "--verbose");
            if args.message.len() != before {
                self.verbose = true;
            }
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Log in with API credentials and a phone code")]
    Login,
    #[command(about = "Forget the saved session")]
    Logout,
    #[command(about = "Send a message to a user or chat")]
    Send(SendArgs),
    #[command(about = "Show recent messages from a conversation")]
    Read(ReadArgs),
    #[command(about = "List open chats")]
    List(ListArgs),
}

#[derive(Args)]
struct SendArgs {
    #[arg(allow_negative_numbers = true, help = "Username, phone number, chat id or name")]
    recipient: String,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Message text; words are joined with spaces"
    )]
    message: Vec<String>,

    #[arg(long, help = "Read the message from standard input")]
    stdin: bool,
}

#[derive(Args)]
struct ReadArgs {
    #[arg(allow_negative_numbers = true, help = "Username, phone number, chat id or name")]
    chat: String,

    #[arg(
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of messages to show"
    )]
    limit: u32,
}

#[derive(Args)]
struct ListArgs {
    #[arg(
        default_value_t = 50,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Maximum number of chats to list"
    )]
    limit: u32,
}

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse();
    cli.lift_verbose_flags();
    init_tracing(cli.verbose);

    let is_send = matches!(cli.command, Command::Send(_));
    if let Err(error) = run(cli).await {
        eprintln!("Error: {error}");
        let unresolved = matches!(error.downcast_ref::<ResolveError>(), Some(ResolveError::NotFound(_)));
        if is_send && unresolved {
            eprintln!("{NOT_FOUND_HINT}");
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load();
    let auth_store = AuthStore::new(config.secrets_path.clone(), config.gateway_url.clone());
    let painter = Painter::detect(cli.no_color);

    match cli.command {
        Command::Login => handle_login(&config, &auth_store).await,
        Command::Logout => {
            auth_store.clear_session()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Send(args) => {
            let message = message_text(&args)?;
            let session = Session::open(&config, &auth_store.load()?).await?;
            let result = send_command(session.client(), &args.recipient, &message, cli.json, painter).await;
            session.close().await;
            println!("{}", result?);
            Ok(())
        }
        Command::Read(args) => {
            let session = Session::open(&config, &auth_store.load()?).await?;
            let result = read_command(session.client(), &args.chat, args.limit as usize, cli.json, painter).await;
            session.close().await;
            println!("{}", result?);
            Ok(())
        }
        Command::List(args) => {
            let session = Session::open(&config, &auth_store.load()?).await?;
            let result = list_command(session.client(), args.limit as usize, cli.json, painter).await;
            session.close().await;
            println!("{}", result?);
            Ok(())
        }
    }
}

fn message_text(args: &SendArgs) -> Result<String, Box<dyn Error>> {
    let text = if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer.trim_end_matches(['\r', '\n']).to_string()
    } else {
        args.message.join(" ")
    };
    if text.trim().is_empty() {
        return Err("Message is required".into());
    }
    Ok(text)
}

/// A peer the service rejects after resolution is reported like an
/// unresolvable recipient.
fn unresolved(query: &str, error: ClientError) -> ResolveError {
    match error {
        ClientError::NotFound(_) => ResolveError::NotFound(query.to_string()),
        other => other.into(),
    }
}

async fn send_command<C: MessagingClient>(
    client: &C,
    recipient: &str,
    message: &str,
    json: bool,
    painter: Painter,
) -> Result<String, Box<dyn Error>> {
    let resolution = resolver::resolve(client, recipient).await?;
    let sent = client
        .send_message(&resolution.peer, message)
        .await
        .map_err(|error| unresolved(recipient, error))?;
    info!(id = sent.id, label = %resolution.label, "message sent");

    if json {
        return Ok(output::json_string(&SendOutput {
            id: sent.id,
            recipient: resolution.label,
            peer: resolution.peer,
        })?);
    }
    Ok(painter.paint(&format!("sent id={} to {}", sent.id, resolution.label), SENT))
}

async fn read_command<C: MessagingClient>(
    client: &C,
    chat: &str,
    limit: usize,
    json: bool,
    painter: Painter,
) -> Result<String, Box<dyn Error>> {
    let resolution = resolver::resolve(client, chat).await?;
    let messages = client
        .get_messages(&resolution.peer, limit)
        .await
        .map_err(|error| unresolved(chat, error))?;
    info!(count = messages.len(), label = %resolution.label, "messages fetched");

    if json {
        return Ok(output::json_string(&MessageListOutput::new(&resolution, &messages))?);
    }

    let header = format!(
        "Conversation with {} {}",
        resolution.conversation_name(),
        resolution.phone_label()
    );
    let mut lines = vec![painter.paint(&header, CONVERSATION_HEADER), String::new()];
    lines.extend(
        bubble::render_history(&messages, &Local)
            .iter()
            .map(|line| line.render(painter)),
    );
    lines.push(String::new());
    lines.push(painter.paint(&format!("Showing {} messages", messages.len()), FOOTER));
    Ok(lines.join("\n"))
}

async fn list_command<C: MessagingClient>(
    client: &C,
    limit: usize,
    json: bool,
    painter: Painter,
) -> Result<String, Box<dyn Error>> {
    let dialogs = client.list_dialogs(limit).await?;
    let table = ChatTable::from_dialogs(&dialogs);

    if json {
        return Ok(output::json_string(&table.rows)?);
    }
    if table.rows.is_empty() {
        return Ok(painter.paint("No open chats found.", FOOTER));
    }
    Ok(table.lines(painter).join("\n"))
}

async fn handle_login(config: &Config, auth_store: &AuthStore) -> Result<(), Box<dyn Error>> {
    let mut credentials = auth_store.load()?;

    let reuse = match credentials.api() {
        Some((api_id, _)) => Confirm::new()
            .with_prompt(format!("Use saved API credentials (API ID {api_id})?"))
            .default(true)
            .interact()?,
        None => false,
    };
    if !reuse {
        let api_id: String = Input::new().with_prompt("API ID").interact_text()?;
        let api_id: i32 = api_id.trim().parse().map_err(|_| "Invalid API ID")?;
        let api_hash: String = Input::new().with_prompt("API Hash").interact_text()?;
        credentials.api_id = Some(api_id);
        credentials.api_hash = Some(api_hash.trim().to_string());
        credentials.session = None;
        auth_store.store(&credentials)?;
    }

    let Some((api_id, api_hash)) = credentials.api() else {
        return Err("API ID and API Hash are required".into());
    };
    let mut client = GatewayClient::new(config, api_id, api_hash, None)?;
    client.connect().await?;

    let outcome = async {
        let session = sign_in(&client).await?;
        credentials.session = Some(session);
        auth_store.store(&credentials)?;
        Ok::<User, Box<dyn Error>>(client.get_me().await?)
    }
    .await;

    if let Err(error) = client.disconnect().await {
        warn!(%error, "disconnect failed");
    }

    let me = outcome?;
    println!("Logged in as: {}", describe_user(&me));
    println!("Session saved to {}", auth_store.path().display());
    Ok(())
}

async fn sign_in(client: &GatewayClient) -> Result<String, Box<dyn Error>> {
    let phone: String = Input::new().with_prompt("Phone number").interact_text()?;
    let phone = phone.trim().to_string();
    let device_name = hostname::get().ok().and_then(|name| name.into_string().ok());

    let sent = client.send_code(&phone, device_name.as_deref()).await?;
    let code: String = Input::new().with_prompt("Code").interact_text()?;
    let signed_in = client.sign_in(&phone, &sent.phone_code_hash, code.trim()).await?;
    if signed_in.password_required {
        let password = Password::new().with_prompt("Password").interact()?;
        client.check_password(&password).await?;
    }
    Ok(client.export_session().await?)
}

fn describe_user(user: &User) -> String {
    let name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let username = match user.username.as_deref() {
        Some(username) if !username.is_empty() => format!("@{username}"),
        _ => "no username".to_string(),
    };
    format!("{} ({username})", name.trim())
}
