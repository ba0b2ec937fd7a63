//! repost-post - Publish text to every active account of a user

use std::io::{IsTerminal, Read};
use std::path::Path;

use clap::Parser;
use librepost::logging::LoggingConfig;
use librepost::types::{ImageMimeType, InlineImage};
use librepost::{
    Config, DispatchRequest, DispatchResponse, PublishService, PublishStatus, RepostError, Result,
};

#[derive(Parser, Debug)]
#[command(name = "repost-post")]
#[command(version, about = "Publish text to every active account", long_about = r#"Publish text (and optionally an image) to every active account of the
user identified by --token. One line per account is printed; failures on
one account never stop the others.

EXAMPLES:
    repost-post --token $TOKEN --article-id a1 "Hello channels"
    echo "From stdin" | repost-post --token $TOKEN --article-id a1
    repost-post --token $TOKEN --article-id a1 --image cover.png "With a picture"
    repost-post --token $TOKEN --article-id a1 --format json "Hi" | jq '.results[]'

EXIT CODES:
    0 - Published (per the configured status policy)
    1 - Not published, or configuration/database error
    2 - Authentication failed (unknown token)
    3 - Invalid input (empty text, unreadable image)
"#)]
struct Cli {
    /// Text to publish (reads from stdin if not provided)
    text: Option<String>,

    /// User token
    #[arg(long, env = "REPOST_TOKEN", hide_env_values = true)]
    token: String,

    /// Article id recorded in the history log
    #[arg(long, value_name = "ID")]
    article_id: String,

    /// Image file, http(s) URL or data URL
    #[arg(long, value_name = "IMAGE")]
    image: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let text = match cli.text {
        Some(text) => text,
        None => read_stdin()?,
    };

    let image = cli.image.as_deref().map(resolve_image).transpose()?;
    tracing::debug!(
        "Publishing article {} ({} characters, image: {})",
        cli.article_id,
        text.chars().count(),
        image.is_some()
    );

    let config = Config::load()?;
    let service = PublishService::from_config(&config).await?;

    let response = service
        .publish(
            &cli.token,
            DispatchRequest {
                article_id: cli.article_id,
                text,
                image,
            },
        )
        .await?;

    match cli.format.as_str() {
        "json" => print_json(&response)?,
        _ => print_text(&response),
    }

    Ok(if response.success { 0 } else { 1 })
}

fn read_stdin() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(RepostError::InvalidInput(
            "No text given. Pass it as an argument or pipe it on stdin.".to_string(),
        ));
    }

    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|e| RepostError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}

/// URLs and data URLs pass through; anything else is read as a file
fn resolve_image(raw: &str) -> Result<String> {
    if raw.starts_with("data:") || raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(raw.to_string());
    }

    let path = Path::new(raw);
    let mime_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageMimeType::from_extension)
        .ok_or_else(|| {
            RepostError::InvalidInput(format!(
                "Unsupported image type: {} (use jpg, png, gif or webp)",
                path.display()
            ))
        })?;
    let bytes = std::fs::read(path).map_err(|e| {
        RepostError::InvalidInput(format!("Failed to read image {}: {}", path.display(), e))
    })?;

    Ok(InlineImage { mime_type, bytes }.to_data_url())
}

fn print_json(response: &DispatchResponse) -> Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| RepostError::InvalidInput(format!("Failed to encode output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_text(response: &DispatchResponse) {
    if response.results.is_empty() {
        println!("No active accounts");
        return;
    }

    for result in &response.results {
        let symbol = match result.status {
            PublishStatus::Success => "✓",
            PublishStatus::Failed => "✗",
            PublishStatus::PendingIntegration => "…",
            PublishStatus::Skipped => "-",
        };
        let detail = result
            .platform_post_id
            .as_deref()
            .or(result.error_message.as_deref())
            .unwrap_or_default();
        println!(
            "{} {} ({}): {}",
            symbol, result.platform, result.account_name, detail
        );
    }
}
