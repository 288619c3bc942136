use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, MembershipSet, Platform};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub platform: Platform,
    pub categories: Vec<String>,
    #[serde(default)]
    pub client_accounts: Vec<String>,
    pub notes: Option<String>,
}

impl AccountConfig {
    /// Username as stored: trimmed, without a leading `@`, lowercased.
    #[must_use]
    pub fn normalized_username(&self) -> String {
        self.username
            .trim()
            .trim_start_matches('@')
            .to_lowercase()
    }

    #[must_use]
    pub fn category_set(&self) -> MembershipSet {
        self.categories.iter().collect()
    }

    #[must_use]
    pub fn client_account_set(&self) -> MembershipSet {
        self.client_accounts.iter().collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountsFile {
    pub accounts: Vec<AccountConfig>,
}

impl AccountsFile {
    /// Distinct categories across all entries, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut all = MembershipSet::new();
        for account in &self.accounts {
            all.merge(&account.category_set());
        }
        all.to_vec()
    }
}

/// Load and validate the tracked-account registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_accounts(path: &Path) -> Result<AccountsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AccountsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let accounts_file: AccountsFile = serde_yaml::from_str(&content)?;

    validate_accounts(&accounts_file)?;

    Ok(accounts_file)
}

fn is_valid_category(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn validate_accounts(accounts_file: &AccountsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for account in &accounts_file.accounts {
        let username = account.normalized_username();
        if username.is_empty() {
            return Err(ConfigError::Validation(
                "account username must be non-empty".to_string(),
            ));
        }

        if account.categories.is_empty() {
            return Err(ConfigError::Validation(format!(
                "account '{username}' on {} has no categories",
                account.platform
            )));
        }

        if let Some(bad) = account
            .categories
            .iter()
            .find(|c| !is_valid_category(c.trim()))
        {
            return Err(ConfigError::Validation(format!(
                "account '{username}' has invalid category '{bad}'; use lowercase letters, digits and '_'"
            )));
        }

        if !seen.insert((account.platform, username.clone())) {
            return Err(ConfigError::Validation(format!(
                "duplicate account: {}/{username}",
                account.platform
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "accounts_test.rs"]
mod tests;
