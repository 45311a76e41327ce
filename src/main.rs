//! OnlyPaws - command line client for the OnlyPaws pet social network
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use onlypaws::api::endpoints;
use onlypaws::auth::{EncryptedFileStore, jwt};
use onlypaws::models::{Notification, Post};
use onlypaws::pagination::{EndpointPages, PaginatedFetch};
use onlypaws::{Config, Session};

type CliSession = Session<EncryptedFileStore>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match parse_args()? {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
        command => {
            let config = Config::load()?;
            let session = Arc::new(Session::connect(
                &config.api_base_url,
                EncryptedFileStore::open()?,
            ));
            match command {
                Command::Login { username, password } => {
                    login(&session, &username, password).await
                }
                Command::Logout => logout(&session).await,
                Command::Status => status(&session, &config).await,
                Command::Feed { user, limit } => {
                    let endpoint = user.as_deref().map_or_else(
                        || endpoints::FEED.to_string(),
                        endpoints::user_posts,
                    );
                    let posts: Vec<Post> =
                        collect_pages(&session, &config, endpoint, limit).await?;
                    print_posts(&posts);
                    Ok(())
                }
                Command::Notifications { limit } => {
                    let notifications: Vec<Notification> =
                        collect_pages(&session, &config, endpoints::NOTIFICATIONS, limit).await?;
                    print_notifications(&notifications);
                    Ok(())
                }
                Command::Help | Command::Version => Ok(()),
            }
        }
    }
}

/// CLI commands
enum Command {
    Login {
        username: String,
        password: Option<String>,
    },
    Logout,
    Status,
    Feed {
        user: Option<String>,
        limit: usize,
    },
    Notifications {
        limit: usize,
    },
    Help,
    Version,
}

fn parse_limit(args: &[String]) -> usize {
    args.iter()
        .position(|a| a == "--limit" || a == "-l")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(20)
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "login" => {
            let username = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing username"))?
                .clone();
            let password = args.get(3).cloned();
            Ok(Command::Login { username, password })
        }

        "logout" => Ok(Command::Logout),
        "status" => Ok(Command::Status),

        "feed" => {
            let user = args
                .get(2)
                .filter(|a| !a.starts_with('-'))
                .cloned();
            Ok(Command::Feed {
                user,
                limit: parse_limit(&args),
            })
        }

        "notifications" | "notifs" => Ok(Command::Notifications {
            limit: parse_limit(&args),
        }),

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'onlypaws --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"🐾 OnlyPaws - the social network for pets

USAGE:
    onlypaws [COMMAND]

COMMANDS:
    login <username> [password]        Log in (prompts for the password if omitted)
    logout                             Forget stored tokens
    status                             Show login state and token expiry

    feed [username] [OPTIONS]          Show your feed, or one user's posts
      Options:
        -l, --limit <n>                Number of posts (default: 20)
      Examples:
        onlypaws feed
        onlypaws feed rex --limit 50

    notifications [OPTIONS]            Show recent notifications
      Options:
        -l, --limit <n>                Number of notifications (default: 20)

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    RUST_LOG=debug                     Verbose logging to stderr

CONFIG:
    {}
"#,
        config_path
    );
}

fn print_version() {
    println!("onlypaws {}", onlypaws::VERSION);
}

async fn login(session: &CliSession, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            println!("Password for @{}:", username);
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };

    session
        .login(username, &password)
        .await
        .context("Login failed")?;
    println!("✓ Logged in as @{}", username);
    Ok(())
}

async fn logout(session: &CliSession) -> Result<()> {
    session.logout().await?;
    println!("✓ Logged out");
    Ok(())
}

async fn status(session: &CliSession, config: &Config) -> Result<()> {
    println!("API: {}", config.api_base_url);

    let tokens = session.tokens();
    let Some(access) = tokens.get_access_token().await? else {
        println!("Not logged in. Run: onlypaws login <username>");
        return Ok(());
    };

    match jwt::expires_at(&access) {
        Some(exp) => println!("Access token expires {}", exp.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Access token expiry unknown"),
    }

    match tokens.get_refresh_token().await? {
        Some(refresh) if jwt::is_refresh_token_valid(&refresh) => {
            if let Some(exp) = jwt::expires_at(&refresh) {
                println!("Refresh token valid until {}", exp.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        Some(_) => println!("Refresh token expired, log in again"),
        None => println!("No refresh token stored"),
    }
    Ok(())
}

/// Walk pages of `endpoint` until `limit` items are loaded or the list ends.
async fn collect_pages<T>(
    session: &Arc<CliSession>,
    config: &Config,
    endpoint: impl Into<String>,
    limit: usize,
) -> Result<Vec<T>>
where
    T: DeserializeOwned + Clone,
{
    let source = EndpointPages::new(Arc::clone(session), endpoint)
        .with_page_size(config.page_size.min(limit.max(1)));
    let list: PaginatedFetch<T, _> = PaginatedFetch::new(source);

    list.load().await;
    if list.state().has_initial_fetch_error {
        anyhow::bail!("Failed to load the first page (see RUST_LOG=warn output)");
    }

    while list.state().data.len() < limit && list.state().can_fetch_next() {
        list.fetch_next().await;
        if list.state().has_fetch_next_error {
            tracing::warn!("Stopped paging after an error");
            break;
        }
    }

    let mut items = list.state().data.clone();
    items.truncate(limit);
    Ok(items)
}

fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts yet");
        return;
    }
    for post in posts {
        println!(
            "\n{} · {}",
            post.author.handle(),
            post.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("{}", post.preview(280));
        println!(
            "♥ {}  💬 {}  📷 {}",
            post.like_count,
            post.comment_count,
            post.images.len()
        );
    }
}

fn print_notifications(notifications: &[Notification]) {
    if notifications.is_empty() {
        println!("No notifications");
        return;
    }
    for notification in notifications {
        let marker = if notification.is_read { " " } else { "•" };
        println!(
            "{} {} {}",
            marker,
            notification.actor.handle(),
            notification.kind.describe()
        );
    }
}
