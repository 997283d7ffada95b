use crate::services::file_store::DEFAULT_MAX_UPLOAD_BYTES;
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: String,
    pub admin: AdminCredentials,
    pub max_upload_bytes: u64,
}

/// Username and password guarding the admin endpoints.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AdminCredentials {
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }
}

/// What the binary should do after loading configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Serve,
    /// Apply the schema and exit.
    Migrate,
    /// Print the most recent catalog rows and exit.
    CheckVideos,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Single-video showcase site with an admin panel")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_SITE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_SITE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded videos are stored (overrides VIDEO_SITE_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Database URL (overrides VIDEO_SITE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Admin username (overrides VIDEO_SITE_ADMIN_USERNAME)
    #[arg(long)]
    pub admin_username: Option<String>,

    /// Admin password (overrides VIDEO_SITE_ADMIN_PASSWORD)
    #[arg(long)]
    pub admin_password: Option<String>,

    /// Upload size ceiling in bytes (overrides VIDEO_SITE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "check_videos")]
    pub migrate: bool,

    /// Print the five most recent videos and exit
    #[arg(long)]
    pub check_videos: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, RunMode)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("VIDEO_SITE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("VIDEO_SITE_PORT", 3000u16)?;
        let env_upload =
            env::var("VIDEO_SITE_UPLOAD_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_db = env::var("VIDEO_SITE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/videos.db".into());
        let env_user = env::var("VIDEO_SITE_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
        let env_pass = env::var("VIDEO_SITE_ADMIN_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.into());
        let env_max = parse_env("VIDEO_SITE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload),
            database_url: args.database_url.unwrap_or(env_db),
            admin: AdminCredentials {
                username: args.admin_username.unwrap_or(env_user),
                password: args.admin_password.unwrap_or(env_pass),
            },
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max),
        };

        let mode = if args.migrate {
            RunMode::Migrate
        } else if args.check_videos {
            RunMode::CheckVideos
        } else {
            RunMode::Serve
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = AdminCredentials {
            username: "root".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("root"));
        assert!(!rendered.contains("hunter2"));
        assert!(!creds.uses_default_password());
    }

    #[test]
    fn args_select_run_mode_flags() {
        let args = Args::parse_from(["video-showcase", "--check-videos", "--port", "8080"]);
        assert!(args.check_videos);
        assert!(!args.migrate);
        assert_eq!(args.port, Some(8080));

        assert!(Args::try_parse_from(["video-showcase", "--migrate", "--check-videos"]).is_err());
    }
}
