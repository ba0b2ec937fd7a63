//! repost-accounts - Manage users and their publishing accounts
//!
//! Secrets (bot tokens, access tokens) are only ever read from stdin and
//! never printed back.

use std::io::{IsTerminal, Read};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use librepost::logging::LoggingConfig;
use librepost::store::IdentityResolver;
use librepost::{Account, Config, Credentials, Database, PlatformKind};
use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "repost-accounts")]
#[command(version, about = "Manage Repost users and publishing accounts", long_about = r#"Manage Repost users and the Telegram / VK accounts they publish to.

EXAMPLES:
    # Create a user and keep the printed token
    repost-accounts register --name newsroom

    # Add accounts; the secret is read from stdin
    echo "$BOT_TOKEN" | repost-accounts --token $TOKEN add telegram --name main --chat-id @news
    echo "$VK_TOKEN" | repost-accounts --token $TOKEN add vk --name wall --owner-id club123

    repost-accounts --token $TOKEN list
    repost-accounts --token $TOKEN disable main
    repost-accounts --token $TOKEN remove wall --platform vk
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User token (required for everything except `register`)
    #[arg(long, global = true, env = "REPOST_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user and print their token
    Register {
        #[arg(long)]
        name: String,
    },

    #[command(flatten)]
    Scoped(ScopedCommands),
}

/// Commands that act on the accounts of the `--token` user
#[derive(Subcommand)]
enum ScopedCommands {
    /// Add a publishing account
    Add {
        #[command(subcommand)]
        account: AddAccount,
    },

    /// List accounts (without secrets)
    List {
        /// Only accounts of this platform
        #[arg(long)]
        platform: Option<PlatformKind>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Change an account's name, target or secret
    Update {
        /// Account id or name
        account: String,

        /// Disambiguate a name shared across platforms
        #[arg(long)]
        platform: Option<PlatformKind>,

        #[arg(long)]
        name: Option<String>,

        /// New Telegram chat id
        #[arg(long)]
        chat_id: Option<String>,

        /// New VK owner id
        #[arg(long)]
        owner_id: Option<String>,

        /// Read a new secret from stdin
        #[arg(long)]
        secret_stdin: bool,
    },

    /// Include an account in future dispatches
    Enable {
        account: String,
        #[arg(long)]
        platform: Option<PlatformKind>,
    },

    /// Exclude an account from future dispatches
    Disable {
        account: String,
        #[arg(long)]
        platform: Option<PlatformKind>,
    },

    /// Delete an account
    Remove {
        account: String,
        #[arg(long)]
        platform: Option<PlatformKind>,
    },
}

#[derive(Subcommand)]
enum AddAccount {
    /// Telegram bot posting to a chat or channel (bot token on stdin)
    Telegram {
        #[arg(long)]
        name: String,

        /// Channel username (@name) or numeric chat id
        #[arg(long)]
        chat_id: String,
    },

    /// VK user or community wall (access token on stdin)
    Vk {
        #[arg(long)]
        name: String,

        /// Numeric id, or id123 / club123 / public123
        #[arg(long)]
        owner_id: String,

        /// Treat a bare positive owner id as a community
        #[arg(long)]
        community: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// What `list` shows for an account
#[derive(Serialize)]
struct AccountView {
    id: String,
    platform: PlatformKind,
    name: String,
    target: Option<String>,
    is_active: bool,
    created_at: i64,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        let target = match &account.credentials {
            Credentials::Telegram(creds) => Some(creds.chat_id.clone()),
            Credentials::Vk(creds) => Some(creds.owner_id.clone()),
            Credentials::Opaque(_) | Credentials::Unreadable(_) => None,
        };
        Self {
            id: account.id.clone(),
            platform: account.platform,
            name: account.name.clone(),
            target,
            is_active: account.is_active,
            created_at: account.created_at,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run_command(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(cli: Cli) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let db = Database::new(&config.database_path())
        .await
        .context("Failed to open database")?;

    let command = match cli.command {
        Commands::Register { name } => return register(&db, &name).await,
        Commands::Scoped(command) => command,
    };

    let user_id = authenticate(&db, cli.token.as_deref()).await?;
    debug!("Authenticated as user {}", user_id);

    match command {
        ScopedCommands::Add { account } => add_account(&db, &user_id, account).await,
        ScopedCommands::List { platform, format } => {
            list_accounts(&db, &user_id, platform, format).await
        }
        ScopedCommands::Update {
            account,
            platform,
            name,
            chat_id,
            owner_id,
            secret_stdin,
        } => {
            let mut existing = find(&db, &user_id, &account, platform).await?;
            if let Some(name) = name {
                existing.name = name;
            }
            apply_target(&mut existing, chat_id, owner_id)?;
            if secret_stdin {
                apply_secret(&mut existing, read_secret()?)?;
            }
            db.update_account(&existing).await?;
            println!("Updated {} account '{}'", existing.platform, existing.name);
            Ok(())
        }
        ScopedCommands::Enable { account, platform } => {
            set_active(&db, &user_id, &account, platform, true).await
        }
        ScopedCommands::Disable { account, platform } => {
            set_active(&db, &user_id, &account, platform, false).await
        }
        ScopedCommands::Remove { account, platform } => {
            let existing = find(&db, &user_id, &account, platform).await?;
            db.delete_account(&user_id, &existing.id).await?;
            println!("Removed {} account '{}'", existing.platform, existing.name);
            Ok(())
        }
    }
}

async fn register(db: &Database, name: &str) -> Result<()> {
    let user = db.create_user(name).await?;
    eprintln!("Registered user '{}'. Keep this token; it cannot be shown again:", user.name);
    println!("{}", user.token);
    Ok(())
}

async fn authenticate(db: &Database, token: Option<&str>) -> Result<String> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        bail!("--token (or REPOST_TOKEN) is required");
    };
    db.resolve_token(token)
        .await?
        .context("Authentication failed: unknown token")
}

/// First line of stdin, trimmed
fn read_secret() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("Pipe the secret on stdin, e.g. echo \"$SECRET\" | repost-accounts ...");
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .context("Failed to read secret from stdin")?;
    let secret = buffer.lines().next().unwrap_or_default().trim().to_string();
    if secret.is_empty() {
        bail!("No secret received on stdin");
    }
    Ok(secret)
}

async fn add_account(db: &Database, user_id: &str, account: AddAccount) -> Result<()> {
    let account = match account {
        AddAccount::Telegram { name, chat_id } => Account::new(
            user_id,
            PlatformKind::Telegram,
            &name,
            Credentials::telegram(read_secret()?, chat_id),
        ),
        AddAccount::Vk {
            name,
            owner_id,
            community,
        } => {
            let credentials = if community {
                Credentials::vk_community(read_secret()?, owner_id)
            } else {
                Credentials::vk(read_secret()?, owner_id)
            };
            Account::new(user_id, PlatformKind::Vk, &name, credentials)
        }
    };

    db.create_account(&account).await?;
    println!("Added {} account '{}' ({})", account.platform, account.name, account.id);
    Ok(())
}

async fn list_accounts(
    db: &Database,
    user_id: &str,
    platform: Option<PlatformKind>,
    format: OutputFormat,
) -> Result<()> {
    let accounts: Vec<AccountView> = db
        .list_accounts(user_id)
        .await?
        .iter()
        .filter(|a| platform.map_or(true, |p| a.platform == p))
        .map(AccountView::from)
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&accounts)?),
        OutputFormat::Text => {
            if accounts.is_empty() {
                println!("No accounts. Add one with: repost-accounts add telegram|vk");
                return Ok(());
            }
            for account in &accounts {
                let state = if account.is_active { "active" } else { "disabled" };
                println!(
                    "{}  {:<8} {:<20} {:<24} {}",
                    account.id,
                    account.platform,
                    account.name,
                    account.target.as_deref().unwrap_or("-"),
                    state
                );
            }
        }
    }
    Ok(())
}

async fn find(
    db: &Database,
    user_id: &str,
    id_or_name: &str,
    platform: Option<PlatformKind>,
) -> Result<Account> {
    db.find_account(user_id, id_or_name, platform)
        .await?
        .with_context(|| format!("No account '{}'", id_or_name))
}

async fn set_active(
    db: &Database,
    user_id: &str,
    id_or_name: &str,
    platform: Option<PlatformKind>,
    active: bool,
) -> Result<()> {
    let account = find(db, user_id, id_or_name, platform).await?;
    db.set_account_active(user_id, &account.id, active).await?;
    let state = if active { "enabled" } else { "disabled" };
    println!("{} account '{}' {}", account.platform, account.name, state);
    Ok(())
}

fn apply_target(account: &mut Account, chat_id: Option<String>, owner_id: Option<String>) -> Result<()> {
    match &mut account.credentials {
        Credentials::Telegram(creds) => {
            if owner_id.is_some() {
                bail!("--owner-id applies to VK accounts");
            }
            if let Some(chat_id) = chat_id {
                creds.chat_id = chat_id;
            }
        }
        Credentials::Vk(creds) => {
            if chat_id.is_some() {
                bail!("--chat-id applies to Telegram accounts");
            }
            if let Some(owner_id) = owner_id {
                creds.owner_id = owner_id;
            }
        }
        Credentials::Opaque(_) => {
            if chat_id.is_some() || owner_id.is_some() {
                bail!("{} accounts have no chat or owner id", account.platform);
            }
        }
        Credentials::Unreadable(_) => {
            bail!("Stored credentials of '{}' cannot be read; remove and re-add the account", account.name)
        }
    }
    Ok(())
}

fn apply_secret(account: &mut Account, secret: String) -> Result<()> {
    match &mut account.credentials {
        Credentials::Telegram(creds) => creds.bot_token = SecretString::from(secret),
        Credentials::Vk(creds) => creds.access_token = SecretString::from(secret),
        Credentials::Opaque(creds) => {
            creds
                .fields
                .insert("token".to_string(), SecretString::from(secret));
        }
        Credentials::Unreadable(_) => {
            bail!("Stored credentials of '{}' cannot be read; remove and re-add the account", account.name)
        }
    }
    Ok(())
}
