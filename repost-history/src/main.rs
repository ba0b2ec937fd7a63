use anyhow::{Context, Result};
use clap::Parser;
use librepost::logging::LoggingConfig;
use librepost::store::IdentityResolver;
use librepost::{Config, Database, HistoryQuery, HistoryRecord, PlatformKind, PublishStatus};

#[derive(Parser, Debug)]
#[command(name = "repost-history")]
#[command(version, about = "Query the publish history log")]
#[command(long_about = r#"Query the publish history of the user identified by --token.

EXAMPLES:
    # Last 20 attempts (default)
    repost-history --token $TOKEN

    # Everything recorded for one article
    repost-history --token $TOKEN --article a1

    # Only VK, more rows
    repost-history --token $TOKEN --platform vk --limit 100

    # JSON for scripting
    repost-history --token $TOKEN --format json | jq '.[] | select(.status == "failed")'

    # JSON lines (one record per line)
    repost-history --token $TOKEN --format jsonl

OUTPUT FORMATS:
    text  - One line per attempt (default)
    json  - JSON array
    jsonl - JSON lines, one object per line

EXIT CODES:
    0 - Success (including empty results)
    1 - Error (unknown token, database not found, query failed)
"#)]
struct Args {
    /// User token
    #[arg(long, env = "REPOST_TOKEN", hide_env_values = true)]
    token: String,

    /// Only records of this article
    #[arg(short, long, value_name = "ID")]
    article: Option<String>,

    /// Only records of this platform (telegram, vk, instagram, facebook)
    #[arg(short, long, value_name = "PLATFORM")]
    platform: Option<PlatformKind>,

    /// Maximum number of records to return
    #[arg(short, long, default_value = "20", value_name = "N")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_text(records: &[HistoryRecord]) {
    for record in records {
        let dt = chrono::DateTime::from_timestamp(record.created_at, 0)
            .unwrap_or_else(chrono::Utc::now);
        let symbol = match record.status {
            PublishStatus::Success => "✓",
            PublishStatus::Failed => "✗",
            PublishStatus::PendingIntegration => "…",
            PublishStatus::Skipped => "-",
        };

        let mut line = format!(
            "{} | {} | {} {} {}",
            dt.format("%Y-%m-%d %H:%M:%S"),
            record.article_id,
            symbol,
            record.platform,
            record.status
        );
        if let Some(ref error) = record.error_log {
            line.push_str(": ");
            line.push_str(error);
        }
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    LoggingConfig::from_env(args.verbose).init();
    tracing::debug!(
        "Querying history (article: {:?}, platform: {:?}, limit: {})",
        args.article,
        args.platform,
        args.limit
    );

    let config = Config::load().context("Failed to load configuration")?;
    let db_path = config.database_path();

    if !std::path::Path::new(&db_path).exists() {
        eprintln!("Error: Database not found at {}", db_path);
        eprintln!("Register a user first: repost-accounts register --name <NAME>");
        std::process::exit(1);
    }

    let db = Database::new(&db_path)
        .await
        .context("Failed to open database")?;

    let Some(user_id) = db.resolve_token(args.token.trim()).await? else {
        eprintln!("Error: Authentication failed: unknown token");
        std::process::exit(1);
    };

    let query = HistoryQuery {
        article_id: args.article,
        platform: args.platform,
        limit: args.limit,
    };
    let records = db
        .query_history(&user_id, &query)
        .await
        .context("Failed to query history")?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        "jsonl" => {
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        _ => print_text(&records),
    }

    Ok(())
}
