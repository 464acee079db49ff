use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Session Sync - authenticated paginated API client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Authentication service base URL
    #[arg(long = "auth-url", env = "AUTH_BASE_URL", default_value = "https://null.lab.xhos.dev")]
    pub auth_url: String,

    /// Listing service base URL
    #[arg(long = "api-url", env = "API_BASE_URL", default_value = "https://null-api.lab.xhos.dev")]
    pub api_url: String,

    /// Path to the credential SQLite database
    #[arg(short = 'd', long, env = "CREDENTIALS_DB_FILE")]
    pub db_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and store the session
    Login {
        /// Account email
        #[arg(short, long, env = "SYNC_EMAIL")]
        email: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long, env = "SYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Show the stored session and check it against the server
    Status,

    /// Exchange the session for a fresh bearer credential
    Renew,

    /// List transactions page by page
    List {
        /// Subject to list for (defaults to the signed-in user)
        #[arg(long, env = "SYNC_USER_ID")]
        user_id: Option<String>,

        /// Maximum number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: u32,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Service endpoints
    pub auth_base_url: String,
    pub api_base_url: String,

    // Credential persistence
    pub credentials_db_file: PathBuf,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let command = args.command.clone();
        Ok((Self::from_args(args)?, command))
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let credentials_db_file = match args.db_file {
            Some(path) => expand_tilde(&path),
            None => default_db_path().context(
                "Could not determine a data directory (use -d or set CREDENTIALS_DB_FILE)",
            )?,
        };

        Ok(Config {
            auth_base_url: normalize_base_url(&args.auth_url),
            api_base_url: normalize_base_url(&args.api_url),
            credentials_db_file,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("AUTH_BASE_URL", &self.auth_base_url),
            ("API_BASE_URL", &self.api_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL: {}", name, url);
            }
        }

        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        Ok(())
    }
}

/// Strip whitespace and trailing slashes so paths can be appended
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Default credential database location under the user's data directory
fn default_db_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("session-sync").join("credentials.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("session-sync").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.txt");
        assert!(path.to_string_lossy().contains("test/file.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://a.dev/"), "https://a.dev");
        assert_eq!(normalize_base_url(" https://a.dev// "), "https://a.dev");
        assert_eq!(normalize_base_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_from_args_applies_cli_values() {
        let args = parse(&[
            "--auth-url",
            "http://127.0.0.1:3000/",
            "--api-url",
            "http://127.0.0.1:4000",
            "-d",
            "/tmp/creds.sqlite3",
            "list",
            "--pages",
            "3",
        ]);
        assert_eq!(
            args.command,
            Command::List {
                user_id: None,
                pages: 3
            }
        );

        let config = Config::from_args(args).unwrap();
        assert_eq!(config.auth_base_url, "http://127.0.0.1:3000");
        assert_eq!(config.credentials_db_file, PathBuf::from("/tmp/creds.sqlite3"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_urls() {
        let args = parse(&["--auth-url", "ftp://example.com", "-d", "/tmp/x", "status"]);
        let config = Config::from_args(args).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_login_subcommand() {
        let args = parse(&["-d", "/tmp/x", "login", "--email", "a@x.com"]);
        assert!(matches!(
            args.command,
            Command::Login { email: Some(ref e), .. } if e == "a@x.com"
        ));
    }
}
