//! Account registry command handlers.
//!
//! `sync` folds the YAML registry into the database with union semantics:
//! categories and client accounts are only ever added, never removed.

use std::path::PathBuf;

use clap::Subcommand;
use fairscore_core::{AppConfig, MembershipSet, Platform};

/// Sub-commands available under `accounts`.
#[derive(Debug, Subcommand)]
pub enum AccountsCommands {
    /// Upsert every account from the registry file
    Sync {
        /// Registry file (defaults to FAIRSCORE_ACCOUNTS_PATH)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// List tracked accounts
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        platform: Option<Platform>,
    },
    /// Track an account, or add categories to one already tracked
    Add {
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        username: String,
        /// Category to add; repeat for several
        #[arg(long = "category", required = true)]
        categories: Vec<String>,
        /// Client account to associate; repeat for several
        #[arg(long = "client-account")]
        client_accounts: Vec<String>,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: AccountsCommands,
) -> anyhow::Result<()> {
    match command {
        AccountsCommands::Sync { path } => {
            let path = path.unwrap_or_else(|| config.accounts_path.clone());
            run_accounts_sync(pool, &path).await
        }
        AccountsCommands::List { category, platform } => {
            run_accounts_list(pool, category.as_deref(), platform).await
        }
        AccountsCommands::Add {
            platform,
            username,
            categories,
            client_accounts,
        } => run_accounts_add(pool, platform, &username, &categories, &client_accounts).await,
    }
}

/// Load the registry file and upsert each entry.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or any upsert fails.
async fn run_accounts_sync(pool: &sqlx::PgPool, path: &std::path::Path) -> anyhow::Result<()> {
    let file = fairscore_core::load_accounts(path)?;

    for entry in &file.accounts {
        let row = fairscore_db::add_membership(
            pool,
            entry.platform,
            &entry.normalized_username(),
            &entry.category_set(),
            &entry.client_account_set(),
        )
        .await?;
        tracing::debug!(id = row.id, username = %row.username, "account synced");
    }

    println!(
        "synced {} accounts across {} categories from {}",
        file.accounts.len(),
        file.categories().len(),
        path.display()
    );
    Ok(())
}

async fn run_accounts_list(
    pool: &sqlx::PgPool,
    category: Option<&str>,
    platform: Option<Platform>,
) -> anyhow::Result<()> {
    let rows = fairscore_db::list_accounts(pool, category, platform).await?;

    if rows.is_empty() {
        println!("no tracked accounts; run `accounts sync` first");
        return Ok(());
    }

    println!(
        "{:<6}{:<11}{:<28}{:>12}  CATEGORIES",
        "ID", "PLATFORM", "USERNAME", "FOLLOWERS"
    );
    for row in &rows {
        println!(
            "{:<6}{:<11}{:<28}{:>12}  {}",
            row.id,
            row.platform,
            row.username,
            row.followers,
            row.categories.join(",")
        );
    }
    Ok(())
}

async fn run_accounts_add(
    pool: &sqlx::PgPool,
    platform: Platform,
    username: &str,
    categories: &[String],
    client_accounts: &[String],
) -> anyhow::Result<()> {
    let username = username.trim().trim_start_matches('@').to_lowercase();
    if username.is_empty() {
        anyhow::bail!("username must not be blank");
    }
    let categories: MembershipSet = categories.iter().collect();
    if categories.is_empty() {
        anyhow::bail!("at least one non-blank --category is required");
    }
    let client_accounts: MembershipSet = client_accounts.iter().collect();

    let row =
        fairscore_db::add_membership(pool, platform, &username, &categories, &client_accounts)
            .await?;
    println!(
        "{}/{} (id {}) categories: {}",
        row.platform,
        row.username,
        row.id,
        row.categories.join(",")
    );
    Ok(())
}
