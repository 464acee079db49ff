use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use std::sync::Arc;

use session_sync::auth::{SqliteCredentialStore, TokenManager};
use session_sync::config::{Command, Config};
use session_sync::http_client::{build_client, AuthenticatedGateway};
use session_sync::models::Transaction;
use session_sync::pagination::{
    FetchStatus, HttpPageSource, PagedList, LIST_TRANSACTIONS_PATH,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        auth = %config.auth_base_url,
        api = %config.api_base_url,
        db = %config.credentials_db_file.display(),
        "Configuration loaded"
    );

    let store = SqliteCredentialStore::open(&config.credentials_db_file)
        .context("Failed to open credential store")?;
    let client = build_client(config.http_connect_timeout, config.http_request_timeout)?;
    let tokens = TokenManager::new(Arc::new(store), client.clone(), config.auth_base_url.clone());

    match command {
        Command::Login { email, password } => login(&tokens, email, password).await,
        Command::Logout => {
            tokens.sign_out();
            println!("Signed out");
            Ok(())
        }
        Command::Status => status(&tokens).await,
        Command::Renew => {
            tokens.renew().await?;
            println!("Bearer credential renewed");
            Ok(())
        }
        Command::List { user_id, pages } => {
            let gateway = AuthenticatedGateway::new(client, tokens.clone());
            list(&config, &tokens, gateway, user_id, pages).await
        }
    }
}

async fn login(tokens: &TokenManager, email: Option<String>, password: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };

    tokens.sign_in(&email, &password).await?;

    // Learn the subject identifier now so `list` works without --user-id
    if let Err(e) = tokens.introspect().await {
        tracing::warn!("Signed in, but session check failed: {}", e);
    }

    println!("✅ Signed in as {}", email);
    Ok(())
}

async fn status(tokens: &TokenManager) -> Result<()> {
    let Some(session) = tokens.session() else {
        println!("Not signed in");
        return Ok(());
    };

    println!("  Account:     {}", session.account_identity.as_deref().unwrap_or("-"));
    println!(
        "  Bearer:      {}",
        if session.bearer_token.is_some() { "present" } else { "missing" }
    );

    match tokens.introspect().await {
        Ok(info) => {
            println!("  User ID:     {}", info.session.user_id);
            if let Some(expires_at) = info.session.expires_at {
                println!("  Expires:     {}", expires_at.to_rfc3339());
            }
        }
        Err(e) => println!("  Session:     invalid ({})", e),
    }
    Ok(())
}

async fn list(
    config: &Config,
    tokens: &TokenManager,
    gateway: AuthenticatedGateway,
    user_id: Option<String>,
    pages: u32,
) -> Result<()> {
    if !tokens.is_authenticated() {
        anyhow::bail!("Not signed in (run `session-sync login` first)");
    }

    let user_id = match user_id.or_else(|| tokens.user_id()) {
        Some(id) => id,
        None => tokens
            .introspect()
            .await
            .context("User id not available")?
            .session
            .user_id,
    };

    let source = HttpPageSource::<Transaction>::new(gateway, &config.api_base_url, LIST_TRANSACTIONS_PATH);
    let list = PagedList::new(Arc::new(source), Arc::new(tokens.clone()), user_id);

    list.load_first().await;
    for _ in 1..pages.max(1) {
        if !list.state().can_load_more() {
            break;
        }
        list.load_more().await;
    }

    let state = list.state();
    if let FetchStatus::Error(message) = &state.status {
        anyhow::bail!("Failed to load transactions: {}", message);
    }

    for tx in &state.items {
        let date = tx
            .tx_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{:<10}  {:<40}  {:>14}",
            date,
            tx.display_title(),
            tx.display_amount().unwrap_or_default()
        );
    }

    println!();
    println!(
        "{} of {} transactions{}",
        state.items.len(),
        state.total_count,
        if state.has_more { " (more available)" } else { "" }
    );
    if let Some(error) = &state.error {
        eprintln!("⚠️  Stopped early: {}", error);
    }

    Ok(())
}
