//! Command-line and environment configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use redact_core::GeneratorOptions;

/// Command-line arguments for the redaction server
#[derive(Parser, Debug)]
#[command(name = "redact-server")]
#[command(about = "PDF redaction service")]
pub struct Args {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Replace all documents with the bundled sample documents
    Seed,
    /// Copy a PDF into the media root and register it
    Import {
        path: PathBuf,
        /// Defaults to the file name without extension
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001", global = true)]
    pub port: u16,

    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Directory that document files are stored under
    #[arg(long, env = "MEDIA_ROOT", default_value = "./media", global = true)]
    pub media_root: PathBuf,

    /// Optional frontend assets served under /static
    #[arg(long, env = "STATIC_DIR", global = true)]
    pub static_dir: Option<PathBuf>,

    /// Also strip text underneath area redactions
    #[arg(long, env = "STRIP_AREA_TEXT", global = true)]
    pub strip_area_text: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            strip_area_text: self.strip_area_text,
        }
    }

    /// Configured URL, or a database in the platform data directory
    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("redact-server");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/redact.db?mode=rwc", data_dir.display())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["redact-server"]).unwrap();
        assert_eq!(args.command, None);
        assert_eq!(args.config.media_root, PathBuf::from("./media"));
        assert!(!args.config.generator_options().strip_area_text);
    }

    #[test]
    fn test_import_subcommand_accepts_global_flags() {
        let args = Args::try_parse_from([
            "redact-server",
            "import",
            "contract.pdf",
            "--title",
            "Contract",
            "--media-root",
            "/tmp/media",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Some(Command::Import {
                path: PathBuf::from("contract.pdf"),
                title: Some("Contract".to_string()),
            })
        );
        assert_eq!(args.config.media_root, PathBuf::from("/tmp/media"));
    }

    #[test]
    fn test_default_database_lives_in_data_dir() {
        let mut config = Args::try_parse_from(["redact-server"]).unwrap().config;
        config.database_url = None;
        let url = config.database_url();
        assert!(url.starts_with("sqlite:"), "{}", url);
        assert!(url.ends_with("redact.db?mode=rwc"), "{}", url);
        if let Some(data_dir) = dirs::data_dir() {
            assert!(url.contains(&data_dir.join("redact-server").display().to_string()));
        }
    }

    #[test]
    fn test_explicit_database_url_wins() {
        let args =
            Args::try_parse_from(["redact-server", "--database-url", "sqlite::memory:"]).unwrap();
        assert_eq!(args.config.database_url(), "sqlite::memory:");
    }
}
