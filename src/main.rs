//! Loftly - cross-post to Mastodon, Pixelfed, Lemmy and Bluesky from one place
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use loftly::api::PublishApi;
use loftly::models::Platform;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments
    match parse_args()? {
        Command::Link { platform, instance } => link_flow(&platform, instance.as_deref()).await,
        Command::Unlink { handle } => unlink_account(&handle),
        Command::SetEnabled { handle, enabled } => set_enabled(&handle, enabled),
        Command::Post {
            content,
            platforms,
            images,
            title,
            community,
        } => post_cli(&content, &platforms, images, title, community).await,
        Command::History { limit } => history_cli(limit),
        Command::Communities { query, host } => communities_cli(&query, host.as_deref()).await,
        Command::Accounts => list_accounts(),
        Command::Instances => list_instances(),
        Command::Plan => show_plan(),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Link {
        platform: String,
        instance: Option<String>,
    },
    Unlink {
        handle: String,
    },
    SetEnabled {
        handle: String,
        enabled: bool,
    },
    Post {
        content: String,
        platforms: Vec<String>,
        images: Vec<PathBuf>,
        title: Option<String>,
        community: Option<String>,
    },
    History {
        limit: Option<usize>,
    },
    Communities {
        query: String,
        host: Option<String>,
    },
    Accounts,
    Instances,
    Plan,
    Help,
    Version,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "link" => {
            let platform = args
                .get(2)
                .ok_or_else(|| {
                    anyhow::anyhow!("Missing platform (mastodon, pixelfed, lemmy or bluesky)")
                })?
                .clone();
            let instance = args.get(3).cloned();
            Ok(Command::Link { platform, instance })
        }

        "unlink" => {
            let handle = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing account handle"))?
                .trim_start_matches('@')
                .to_string();
            Ok(Command::Unlink { handle })
        }

        "enable" | "disable" => {
            let handle = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing account handle"))?
                .trim_start_matches('@')
                .to_string();
            Ok(Command::SetEnabled {
                handle,
                enabled: args[1] == "enable",
            })
        }

        "post" => {
            let content = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing post content"))?
                .clone();

            let mut platforms = Vec::new();
            let mut images = Vec::new();
            let mut title = None;
            let mut community = None;
            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--to" | "-t" => {
                        if let Some(nets) = args.get(i + 1) {
                            platforms.extend(nets.split(',').map(String::from));
                        }
                        i += 2;
                    }
                    "--image" | "-i" => {
                        if let Some(path) = args.get(i + 1) {
                            images.push(PathBuf::from(path));
                        }
                        i += 2;
                    }
                    "--title" => {
                        title = args.get(i + 1).cloned();
                        i += 2;
                    }
                    "--community" | "-c" => {
                        community = args.get(i + 1).cloned();
                        i += 2;
                    }
                    _ => i += 1,
                }
            }

            Ok(Command::Post {
                content,
                platforms,
                images,
                title,
                community,
            })
        }

        "history" => {
            let limit = args
                .iter()
                .position(|a| a == "--limit" || a == "-l")
                .and_then(|i| args.get(i + 1))
                .and_then(|s| s.parse().ok());
            Ok(Command::History { limit })
        }

        "communities" => {
            let query = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing search query"))?
                .clone();
            let host = args
                .iter()
                .position(|a| a == "--host")
                .and_then(|i| args.get(i + 1))
                .cloned();
            Ok(Command::Communities { query, host })
        }

        "accounts" => Ok(Command::Accounts),
        "instances" => Ok(Command::Instances),
        "plan" => Ok(Command::Plan),

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'loftly --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = loftly::Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"{}
📣 Loftly - cross-post to the open social web

USAGE:
    loftly [COMMAND]

COMMANDS:
    link <platform> [host]             Link an account
      Examples:
        loftly link mastodon mastodon.social
        loftly link pixelfed pixelfed.social
        loftly link lemmy lemmy.world
        loftly link bluesky

    unlink <handle>                    Remove a linked account
    enable <handle>                    Include an account when posting
    disable <handle>                   Skip an account when posting

    post <content> [OPTIONS]           Cross-post to linked accounts
      Options:
        -t, --to <platforms>           Comma-separated platforms (default: all enabled)
        -i, --image <path>             Attach an image (repeatable)
            --title <text>             Post title (required for Lemmy)
        -c, --community <name>         Target community (required for Lemmy)
      Examples:
        loftly post "Hello world!"
        loftly post "Hello Fediverse!" --to mastodon,bluesky
        loftly post "Sunset" --to pixelfed --image sunset.jpg

    history [OPTIONS]                  Show post history with delivery outcomes
      Options:
        -l, --limit <n>                Number of posts (default from config)

    communities <query> [--host h]     Search Lemmy communities
      Examples:
        loftly communities rust
        loftly communities birding --host lemmy.world

    accounts                           List linked accounts
    instances                          List registered instance apps
    plan                               Show plan limits and usage

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}

HOMEPAGE:
    {}
"#,
        loftly::LOGO,
        config_path,
        loftly::REPO_URL
    );
}

fn print_version() {
    println!("loftly {}", loftly::VERSION);
}

/// Read one trimmed line from stdin
fn prompt_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn link_flow(platform: &str, instance: Option<&str>) -> Result<()> {
    let platform = Platform::from_str(platform).ok_or_else(|| {
        anyhow::anyhow!("Unknown platform: {platform}\nSupported: mastodon, pixelfed, lemmy, bluesky")
    })?;

    let db = loftly::Database::open()?;
    loftly::billing::check_account_limit(&db)?;

    match platform {
        Platform::Mastodon => link_mastodon(&db, instance).await,
        Platform::Pixelfed => link_pixelfed(&db, instance).await,
        Platform::Lemmy => link_lemmy(&db, instance).await,
        Platform::Bluesky => link_bluesky(&db).await,
    }
}

async fn link_mastodon(db: &loftly::Database, instance: Option<&str>) -> Result<()> {
    let instance = instance.ok_or_else(|| {
        anyhow::anyhow!("Mastodon requires a host\nExample: loftly link mastodon mastodon.social")
    })?;
    let domain = loftly::models::instance::normalize_domain(instance);
    let base_url = format!("https://{domain}");

    println!("🐘 Linking Mastodon account ({domain})...");

    // Reuse the cached app registration for this host, or register once
    let app = match db.get_instance_app(Platform::Mastodon, &domain)? {
        Some(app) => {
            println!("✓ Using registered app for {domain}");
            app
        }
        None => {
            let registered = loftly::api::mastodon::oauth::register_app(&base_url).await?;
            let app = loftly::InstanceApp::new(
                Platform::Mastodon,
                &domain,
                &registered.client_id,
                &registered.client_secret,
            );
            db.insert_instance_app(&app)?;
            println!("✓ App registered");
            app
        }
    };

    let auth_url = loftly::api::mastodon::oauth::get_auth_url(&base_url, &app.client_key);
    println!("\n📋 Open this URL in your browser:\n\n  {auth_url}\n");
    let _ = open::that(&auth_url);

    println!("Paste the authorization code here:");
    let code = prompt_line()?;

    let token = loftly::api::mastodon::oauth::get_token(
        &base_url,
        &app.client_key,
        &app.client_secret,
        &code,
    )
    .await?;

    // Verify and persist
    let client = loftly::api::mastodon::MastodonClient::new(&base_url, &token.access_token);
    let account = client.verify_credentials().await?;

    db.insert_account(&account)?;
    loftly::auth::store_secret(&account, &token.access_token)?;

    println!("\n✓ Linked {}", account.full_handle());
    Ok(())
}

async fn link_pixelfed(db: &loftly::Database, instance: Option<&str>) -> Result<()> {
    let instance = instance.ok_or_else(|| {
        anyhow::anyhow!("Pixelfed requires a host\nExample: loftly link pixelfed pixelfed.social")
    })?;
    let domain = loftly::models::instance::normalize_domain(instance);
    let base_url = format!("https://{domain}");

    println!("📷 Linking Pixelfed account ({domain})...");

    let app = match db.get_instance_app(Platform::Pixelfed, &domain)? {
        Some(app) => {
            println!("✓ Using registered app for {domain}");
            app
        }
        None => {
            let registered = loftly::api::pixelfed::oauth::register_app(&base_url).await?;
            let app = loftly::InstanceApp::new(
                Platform::Pixelfed,
                &domain,
                &registered.client_id,
                &registered.client_secret,
            );
            db.insert_instance_app(&app)?;
            println!("✓ App registered");
            app
        }
    };

    let auth_url = loftly::api::pixelfed::oauth::get_auth_url(&base_url, &app.client_key);
    println!("\n📋 Open this URL in your browser:\n\n  {auth_url}\n");
    let _ = open::that(&auth_url);

    println!("Paste the authorization code here:");
    let code = prompt_line()?;

    let token = loftly::api::pixelfed::oauth::get_token(
        &base_url,
        &app.client_key,
        &app.client_secret,
        &code,
    )
    .await?;

    let client = loftly::api::pixelfed::PixelfedClient::new(&base_url, &token.access_token);
    let account = client.verify_credentials().await?;

    db.insert_account(&account)?;
    loftly::auth::store_secret(&account, &token.access_token)?;

    println!("\n✓ Linked {}", account.full_handle());
    Ok(())
}

async fn link_lemmy(db: &loftly::Database, instance: Option<&str>) -> Result<()> {
    let instance = instance.ok_or_else(|| {
        anyhow::anyhow!("Lemmy requires a host\nExample: loftly link lemmy lemmy.world")
    })?;
    let domain = loftly::models::instance::normalize_domain(instance);

    println!("🐭 Linking Lemmy account ({domain})...");

    println!("\nEnter your username or email:");
    let username = prompt_line()?;

    println!("\nEnter your password:");
    let password = prompt_line()?;

    println!("\nEnter your 2FA token (press Enter if none):");
    let totp = prompt_line()?;
    let totp = if totp.is_empty() { None } else { Some(totp) };

    let jwt =
        loftly::api::lemmy::LemmyClient::login(&domain, &username, &password, totp.as_deref())
            .await?;

    let client = loftly::api::lemmy::LemmyClient::new(&domain, &jwt);
    let account = client.verify_credentials().await?;

    db.insert_account(&account)?;
    loftly::auth::store_secret(&account, &jwt)?;

    println!("\n✓ Linked {}", account.full_handle());
    Ok(())
}

async fn link_bluesky(db: &loftly::Database) -> Result<()> {
    println!("🦋 Linking Bluesky account...");
    println!("\nEnter your handle (e.g., you.bsky.social):");
    let handle = prompt_line()?;

    println!("\nEnter your PDS URL (press Enter for default bsky.social):");
    let pds_input = prompt_line()?;
    let pds_url = if pds_input.is_empty() {
        loftly::api::bluesky::DEFAULT_PDS_URL.to_string()
    } else if pds_input.starts_with("http") {
        pds_input
    } else {
        format!("https://{pds_input}")
    };

    println!("\nEnter your app password:");
    println!("(Create one at https://bsky.app/settings/app-passwords)");
    let password = prompt_line()?;

    let client =
        loftly::api::bluesky::BlueskyClient::login_with_pds(&handle, &password, &pds_url).await?;
    let account = client.verify_credentials().await?;

    db.insert_account(&account)?;
    // Store the app password; a fresh session is created per use
    loftly::auth::store_secret(&account, &password)?;

    println!("\n✓ Linked {} (PDS: {pds_url})", account.full_handle());
    Ok(())
}

/// Resolve a user-entered handle, accepting both `name` and `name@host`
fn find_account(db: &loftly::Database, input: &str) -> Result<loftly::LinkedAccount> {
    if let Some(account) = db.get_account_by_handle(input)? {
        return Ok(account);
    }

    if let Some((name, host)) = input.split_once('@') {
        let matches: Vec<_> = db
            .get_accounts()?
            .into_iter()
            .filter(|a| a.handle == name && a.instance.contains(host))
            .collect();
        if let [account] = matches.as_slice() {
            return Ok(account.clone());
        }
    }

    Err(anyhow::anyhow!(
        "No linked account with handle '{input}'. Run 'loftly accounts' to list them."
    ))
}

fn unlink_account(handle: &str) -> Result<()> {
    let db = loftly::Database::open()?;

    let account = find_account(&db, handle)?;

    loftly::auth::delete_secret(&account)?;
    db.delete_account(account.id)?;

    println!("✓ Unlinked {}", account.full_handle());
    Ok(())
}

fn set_enabled(handle: &str, enabled: bool) -> Result<()> {
    let db = loftly::Database::open()?;

    let account = find_account(&db, handle)?;

    db.set_account_enabled(account.id, enabled)?;

    if enabled {
        println!("✓ {} will receive cross-posts", account.full_handle());
    } else {
        println!("✓ {} will be skipped when posting", account.full_handle());
    }
    Ok(())
}

async fn post_cli(
    content: &str,
    platforms: &[String],
    images: Vec<PathBuf>,
    title: Option<String>,
    community: Option<String>,
) -> Result<()> {
    let db = loftly::Database::open()?;
    let config = loftly::Config::load()?;

    // Explicit --to wins, then configured defaults, then every enabled account
    let filter: Vec<Platform> = if platforms.is_empty() {
        config
            .default_platforms
            .iter()
            .filter_map(|p| Platform::from_str(p))
            .collect()
    } else {
        platforms
            .iter()
            .map(|p| {
                Platform::from_str(p).ok_or_else(|| anyhow::anyhow!("Unknown platform: {p}"))
            })
            .collect::<Result<_>>()?
    };

    let accounts: Vec<_> = db
        .get_enabled_accounts()?
        .into_iter()
        .filter(|a| filter.is_empty() || filter.contains(&a.platform))
        .collect();

    let draft = loftly::Draft {
        message: content.to_string(),
        title,
        community,
        images,
    };

    let limits = loftly::ComposeLimits::from_config(&config);

    println!("📣 Posting to {} account(s)...", accounts.len());
    let report = loftly::publish::cross_post(&db, &draft, &accounts, &limits).await?;

    for record in &report.records {
        let label = record.platform.name();
        match record.status {
            loftly::DeliveryStatus::Delivered => {
                if let Some(url) = &record.remote_url {
                    println!("{} {} ✓ {}", record.platform.emoji(), label, url);
                } else {
                    println!("{} {} ✓ delivered", record.platform.emoji(), label);
                }
            }
            _ => {
                println!(
                    "{} {} ✗ {}",
                    record.platform.emoji(),
                    label,
                    record.error.as_deref().unwrap_or("failed")
                );
            }
        }
    }

    println!(
        "\n✓ Delivered to {}/{} account(s)",
        report.delivered(),
        report.records.len()
    );
    Ok(())
}

fn history_cli(limit: Option<usize>) -> Result<()> {
    let db = loftly::Database::open()?;
    let config = loftly::Config::load()?;
    let limit = limit.unwrap_or(config.history_limit);

    let entries = loftly::publish::history(&db, limit)?;

    if entries.is_empty() {
        println!("No posts in your history window yet.");
        return Ok(());
    }

    for (post, records) in entries {
        println!("\n{} · {}", post.relative_time(), post.preview(60));
        for record in records {
            let outcome = match record.status {
                loftly::DeliveryStatus::Delivered => record
                    .remote_url
                    .clone()
                    .unwrap_or_else(|| "delivered".to_string()),
                _ => record.error.clone().unwrap_or_else(|| "failed".to_string()),
            };
            println!(
                "  {} {} {} {}",
                record.status.emoji(),
                record.platform.emoji(),
                record.platform.name(),
                outcome
            );
        }
    }

    Ok(())
}

async fn communities_cli(query: &str, host: Option<&str>) -> Result<()> {
    let db = loftly::Database::open()?;

    let accounts = db.get_accounts_for_platform(Platform::Lemmy)?;
    let account = match host {
        Some(h) => accounts.into_iter().find(|a| a.instance.contains(h)),
        None => accounts.into_iter().next(),
    }
    .ok_or_else(|| {
        anyhow::anyhow!("No linked Lemmy account. Run: loftly link lemmy <host>")
    })?;

    let jwt = loftly::auth::get_secret(&account)?
        .ok_or_else(|| anyhow::anyhow!("No credentials for {}", account.full_handle()))?;

    let client = loftly::api::lemmy::LemmyClient::new(&account.instance, &jwt);
    let communities = client.search_communities(query).await?;

    if communities.is_empty() {
        println!("No communities matched '{query}'.");
        return Ok(());
    }

    println!("Communities on {}:\n", account.instance);
    for community in communities {
        println!("  !{}  {}", community.name, community.title);
    }

    Ok(())
}

fn list_accounts() -> Result<()> {
    let db = loftly::Database::open()?;
    let accounts = db.get_accounts()?;

    if accounts.is_empty() {
        println!("No accounts linked.");
        println!("\nLink an account with:");
        println!("  loftly link mastodon <host>");
        println!("  loftly link pixelfed <host>");
        println!("  loftly link lemmy <host>");
        println!("  loftly link bluesky");
        return Ok(());
    }

    println!("Linked accounts:\n");

    for account in accounts {
        let state = if account.enabled { "" } else { " (disabled)" };
        println!(
            "  {} {} {}{}\n    Host: {}",
            account.platform.emoji(),
            account.platform.name(),
            account.full_handle(),
            state,
            account.instance
        );
    }

    Ok(())
}

fn list_instances() -> Result<()> {
    let db = loftly::Database::open()?;
    let apps = db.get_instance_apps()?;

    if apps.is_empty() {
        println!("No instance apps registered yet.");
        println!("Registrations happen automatically when you link a federated account.");
        return Ok(());
    }

    println!("Registered instance apps:\n");
    for app in apps {
        println!(
            "  {} {} {}\n    Registered: {}",
            app.platform.emoji(),
            app.platform.name(),
            app.domain,
            app.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

fn show_plan() -> Result<()> {
    let db = loftly::Database::open()?;

    let subscription = loftly::billing::ensure_subscription(&db)?;
    let plan = loftly::billing::active_plan(&db)?;
    let usage = db.get_usage()?;
    let linked = db.count_accounts()?;

    println!("Plan: {} (since {})", plan.name, subscription.started_at.format("%Y-%m-%d"));
    println!("\n  Accounts:  {}/{}", linked, plan.max_accounts);
    println!(
        "  Posts:     {}/{} this month",
        usage.posts_this_month, plan.monthly_posts
    );
    println!("  History:   {} days", plan.history_days);

    Ok(())
}
