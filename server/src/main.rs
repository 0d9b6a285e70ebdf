// Clipdeck server entry point: CLI parsing, config loading and bootstrap.
// Routes, services and the authorization core live in the library crate.

pub use clipdeck_server::*;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clipdeck_core::{
    access_token::AccessTokenStore, config::AppConfig, db::Database, user::UserStore,
};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clipdeck collaboration server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP and socket server
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Create a user with a personal workspace and print an access token
    CreateUser(CreateUserArgs),
}

#[derive(Args, Debug)]
struct CreateUserArgs {
    /// Email for the new account
    email: String,
    /// Display name for the new account
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    observability::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let database = Database::connect(&config).await?;
            database.migrate().await?;
            info!(path = %database.database_path().display(), "migrations applied");
            Ok(())
        }
        Command::CreateUser(args) => create_user(config, args).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let database = Database::connect(&config).await?;
    database.migrate().await?;

    let state = build_state(&database, &config);
    let router = router::build_router(state);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!(address = %config.bind_address, "clipdeck server listening");

    axum::serve(listener, router)
        .await
        .context("server exited with an error")
}

async fn create_user(config: AppConfig, args: CreateUserArgs) -> Result<()> {
    let database = Database::connect(&config).await?;
    database.migrate().await?;

    let users = UserStore::new(&database);
    let user = users.create(&args.email, args.name.as_deref()).await?;

    let workspaces = clipdeck_core::workspace::WorkspaceStore::new(&database);
    let provisioned = workspaces
        .provision_personal(user.id.as_str(), &user.email, user.name.as_deref())
        .await?;

    let tokens = AccessTokenStore::new(&database);
    let token = tokens.create(user.id.as_str(), "cli", None).await?;

    println!("user id:      {}", user.id);
    println!("workspace id: {}", provisioned.workspace.id);
    println!(
        "access token: {}",
        token.token.as_deref().unwrap_or_default()
    );
    Ok(())
}
