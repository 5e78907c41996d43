use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use eats_auth::auth::{Argon2Hasher, Claim, CredentialHasher, TokenService};
use eats_auth::{AuthSettings, SECRET_KEY_ENV, UserId, create_state, load_settings};

#[derive(Parser)]
#[command(name = "eats-auth")]
#[command(about = "Token authentication and role-based access service")]
struct Cli {
    /// Signing secret (overrides the config file)
    #[arg(long, env = SECRET_KEY_ENV, hide_env_values = true, global = true)]
    secret_key: Option<String>,
    /// Token lifetime in seconds (tokens never expire when omitted)
    #[arg(long, env = "TOKEN_TTL_SECONDS", global = true)]
    token_ttl_seconds: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        /// Header carrying the identity token
        #[arg(long)]
        token_header: Option<String>,
    },
    /// Hash a secret with the configured cost
    HashPassword { secret: String },
    /// Issue a token for a user id
    IssueToken {
        #[arg(long)]
        id: i64,
    },
    /// Verify a token and print its claim
    VerifyToken { token: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("eats_auth=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    let mut settings = load_settings()?;
    apply_cli_overrides(&mut settings, cli.secret_key, cli.token_ttl_seconds);

    match cli.command {
        Commands::Serve { bind, token_header } => {
            if let Some(header) = token_header {
                settings.token_header = header;
            }
            info!("Starting auth API on {}", bind);
            info!(
                "Token header: {}, token lifetime: {}",
                settings.token_header,
                settings
                    .token_ttl_seconds
                    .map(|s| format!("{}s", s))
                    .unwrap_or_else(|| "unbounded".to_string())
            );

            let state = create_state(&settings)?;
            let app = eats_auth::api::create_router(state);
            let listener = tokio::net::TcpListener::bind(&bind).await?;

            info!("Auth API listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::HashPassword { secret } => {
            let hasher = Argon2Hasher::new(settings.hash_cost)?;
            let digest = hasher.hash(&secret)?;
            println!("{}", digest.as_str());
        }
        Commands::IssueToken { id } => {
            settings.validate()?;
            let tokens = TokenService::new(&settings.secret_key, settings.token_ttl());
            let token = tokens.issue(Claim::new(UserId::new(id)))?;
            println!("{}", token);
        }
        Commands::VerifyToken { token } => {
            settings.validate()?;
            let tokens = TokenService::new(&settings.secret_key, settings.token_ttl());
            match tokens.verify(&token) {
                Ok(claim) => println!("valid: id={}", claim.id),
                Err(e) => {
                    println!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Apply command-line settings on top of the loaded configuration.
fn apply_cli_overrides(
    settings: &mut AuthSettings,
    secret_key: Option<String>,
    token_ttl_seconds: Option<u64>,
) {
    if let Some(secret) = secret_key.filter(|s| !s.is_empty()) {
        settings.secret_key = secret;
    }
    if token_ttl_seconds.is_some() {
        settings.token_ttl_seconds = token_ttl_seconds;
    }
}
