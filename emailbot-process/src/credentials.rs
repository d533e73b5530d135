//! Password resolution for mail sources.
//!
//! Providers are tried in order; the first one that yields a password wins.
//! The usual chain is environment first, then an interactive masked prompt.

use crate::error::CredentialError;

/// Environment variable consulted by [`EnvPassword::default`].
pub const PASSWORD_ENV: &str = "IMAP_PASSWORD";

/// One way of obtaining a password.
pub trait CredentialProvider {
    /// `Ok(None)` when this provider has nothing to offer.
    fn password(&self, username: &str, server: &str) -> Result<Option<String>, CredentialError>;
}

/// Reads the password from an environment variable. Empty counts as unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPassword {
    pub var: String,
}

impl Default for EnvPassword {
    fn default() -> Self {
        Self {
            var: PASSWORD_ENV.to_string(),
        }
    }
}

impl CredentialProvider for EnvPassword {
    fn password(&self, _username: &str, _server: &str) -> Result<Option<String>, CredentialError> {
        Ok(std::env::var(&self.var).ok().filter(|p| !p.is_empty()))
    }
}

/// Asks on the terminal without echoing input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptPassword;

impl CredentialProvider for PromptPassword {
    fn password(&self, username: &str, server: &str) -> Result<Option<String>, CredentialError> {
        let prompt = format!("Enter IMAP Password for {username} on {server}: ");
        let password = rpassword::prompt_password(prompt).map_err(CredentialError::Prompt)?;
        Ok(Some(password))
    }
}

/// A fixed password, for embedding and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPassword(pub String);

impl CredentialProvider for StaticPassword {
    fn password(&self, _username: &str, _server: &str) -> Result<Option<String>, CredentialError> {
        Ok(Some(self.0.clone()))
    }
}

/// Ordered list of providers.
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variable `IMAP_PASSWORD`, then an interactive prompt.
    pub fn interactive() -> Self {
        Self::new()
            .with(EnvPassword::default())
            .with(PromptPassword)
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// First password any provider yields.
    pub fn resolve(&self, username: &str, server: &str) -> Result<String, CredentialError> {
        for provider in &self.providers {
            if let Some(password) = provider.password(username, server)? {
                return Ok(password);
            }
        }
        Err(CredentialError::Unavailable {
            username: username.to_string(),
            server: server.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
