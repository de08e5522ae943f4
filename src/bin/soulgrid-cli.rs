use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "soulgrid-cli")]
#[command(about = "Command line client for a soulgrid server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show your soul and remaining quota
    Me,
    /// Dump the whole grid
    Pixels,
    /// Paint one pixel
    Paint { x: i64, y: i64, color: String },
    /// Create a WIDTH x HEIGHT grid (only succeeds once per server)
    Register {
        #[arg(long)]
        width: i64,
        #[arg(long)]
        height: i64,
    },
    /// List souls, 100 per page
    Souls {
        #[arg(short, long, default_value_t = 1)]
        page: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Me => client.get(format!("{base}/api/souls/me")).send().await?,
        Commands::Pixels => client.get(format!("{base}/api/pixels")).send().await?,
        Commands::Paint { x, y, color } => {
            client
                .post(format!("{base}/api/pixels/paint"))
                .json(&json!({ "x": x, "y": y, "color": color }))
                .send()
                .await?
        }
        Commands::Register { width, height } => {
            let pixels: Vec<Value> = (0..height)
                .flat_map(|y| (0..width).map(move |x| json!({ "x": x, "y": y })))
                .collect();
            client
                .post(format!("{base}/api/pixels/register"))
                .json(&json!({ "pixels": pixels }))
                .send()
                .await?
        }
        Commands::Souls { page } => {
            client
                .get(format!("{base}/api/souls"))
                .query(&[("page", page)])
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(remaining) = res.headers().get("x-ratelimit-remaining") {
        eprintln!("rate limit remaining: {}", remaining.to_str().unwrap_or("?"));
    }

    if status == StatusCode::NO_CONTENT {
        println!("ok");
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
