use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "regional-cli")]
#[command(about = "Command-line client for the Regional API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token from `login`
    #[arg(short, long, env = "REGIONAL_API_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange username and password for a token
    Login { username: String, password: String },
    /// List regional offices
    Regionais,
    /// List artists
    Artists,
    /// Show one artist
    Artist { id: u64 },
    /// Register a new artist
    AddArtist {
        name: String,
        genre: String,
        #[arg(long)]
        regional_id: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
    }

    let request = match cli.command {
        Commands::Login { username, password } => client
            .post(format!("{}/api/auth/login", cli.url))
            .json(&json!({ "username": username, "password": password })),
        Commands::Regionais => client.get(format!("{}/api/regionais", cli.url)),
        Commands::Artists => client.get(format!("{}/api/artists", cli.url)),
        Commands::Artist { id } => client.get(format!("{}/api/artists/{}", cli.url, id)),
        Commands::AddArtist {
            name,
            genre,
            regional_id,
        } => client
            .post(format!("{}/api/artists", cli.url))
            .json(&json!({ "name": name, "genre": genre, "regionalId": regional_id })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Some(retry) = res.headers().get("retry-after").and_then(|v| v.to_str().ok()) {
            eprintln!("Retry after: {}s", retry);
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
