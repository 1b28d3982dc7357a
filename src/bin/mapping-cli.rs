use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "mapping-cli")]
#[command(about = "Management CLI for the link mapping service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "LINK_MAPPING_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status and resolution settings
    Status,
    /// List every mapping
    Mappings,
    /// Create a literal or regex mapping
    Create {
        /// Source pattern
        pattern: String,
        /// Destination link (or page id with --page)
        destination: String,
        /// Treat the destination as a page id
        #[arg(long)]
        page: bool,
        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        /// Redirect status (0 for the default)
        #[arg(long, default_value_t = 0)]
        status: u16,
        /// Preserve method and body (301→308, 303→307)
        #[arg(long)]
        forward_post_body: bool,
    },
    /// Delete a mapping by id
    Delete { id: u64 },
    /// Show the redirect chain for a URL
    Chain {
        url: String,
        /// Resolve against the draft stage
        #[arg(long)]
        draft: bool,
    },
    /// Show the decision for a URL without issuing a request to the site
    Resolve {
        url: String,
        #[arg(long)]
        draft: bool,
        /// Site response status to resolve against
        #[arg(long, default_value_t = 404)]
        status: u16,
    },
}

/// Query parameters for a diagnostic call. Without `--draft` the stage is
/// left to the URL's own `?stage=Stage`.
fn diagnostic_query(url: String, draft: bool) -> Vec<(&'static str, String)> {
    let mut query = vec![("url", url)];
    if draft {
        query.push(("stage", "draft".to_string()));
    }
    query
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Mappings => client.get(format!("{base}/admin/mappings")),
        Commands::Create {
            pattern,
            destination,
            page,
            regex,
            priority,
            status,
            forward_post_body,
        } => {
            let destination = if page {
                json!({ "page": destination.parse::<u64>()? })
            } else {
                json!({ "link": destination })
            };
            client.post(format!("{base}/admin/mappings")).json(&json!({
                "pattern": pattern,
                "pattern_type": if regex { "regex" } else { "literal" },
                "priority": priority,
                "destination": destination,
                "status_code": status,
                "forward_post_body": forward_post_body,
            }))
        }
        Commands::Delete { id } => client.delete(format!("{base}/admin/mappings/{id}")),
        Commands::Chain { url, draft } => client
            .get(format!("{base}/admin/chain"))
            .query(&diagnostic_query(url, draft)),
        Commands::Resolve { url, draft, status } => client
            .get(format!("{base}/admin/resolve"))
            .query(&diagnostic_query(url, draft))
            .query(&[("status", status.to_string())]),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
