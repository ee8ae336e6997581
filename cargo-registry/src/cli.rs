//! Command line interface of the `cargo-registry` admin binary.

use crate::config::Config;
use crate::registry::LocalCargoRegistry;
use crate::types::{Owner, User, Visibility};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cargo-registry")]
#[command(about = "Maintain per-owner Cargo index repositories")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry configuration file
    #[arg(long, default_value = "registry.json", global = true)]
    pub config: PathBuf,

    /// Override `storage.data_dir`
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override `server.app_url`
    #[arg(long, global = true)]
    pub app_url: Option<String>,

    /// Owner whose registry is operated on
    #[arg(long, global = true, default_value = "")]
    pub owner: String,

    /// Owner visibility: public, limited or private
    #[arg(long, global = true, default_value = "public")]
    pub visibility: Visibility,

    /// Committer name, `user.name` from git config when unset
    #[arg(long, global = true)]
    pub committer_name: Option<String>,

    /// Committer email, `user.email` from git config when unset
    #[arg(long, global = true)]
    pub committer_email: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the index repository and write config.json
    Init,

    /// Regenerate every index file from storage
    Rebuild,

    /// Rewrite config.json of an existing index repository
    WriteConfig,

    /// Publish a `cargo publish` request body read from a file
    Publish {
        payload: PathBuf,
    },

    /// Mark a version as yanked
    Yank {
        name: String,
        version: String,
    },

    /// Clear the yanked mark of a version
    Unyank {
        name: String,
        version: String,
    },

    /// Print the index file of a crate
    Show {
        name: String,
    },
}

impl Cli {
    /// Configuration file with command line overrides applied.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(&self.config)
            .with_context(|| format!("Failed to load configuration from {:?}", self.config))?;

        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        if let Some(app_url) = &self.app_url {
            config.server.app_url = app_url.clone();
        }
        Ok(config)
    }

    pub fn owner(&self) -> Result<Owner> {
        if self.owner.trim().is_empty() {
            anyhow::bail!("--owner is required");
        }
        Ok(Owner::new(self.owner.trim(), self.visibility)?)
    }

    /// Committer from flags, falling back to the host's git configuration.
    pub fn committer(&self) -> Result<User> {
        let git_config = git2::Config::open_default().ok();
        let from_git = |key: &str| {
            git_config
                .as_ref()
                .and_then(|config| config.get_string(key).ok())
        };

        let name = self
            .committer_name
            .clone()
            .or_else(|| from_git("user.name"))
            .context("No committer name: pass --committer-name or set git user.name")?;
        let email = self
            .committer_email
            .clone()
            .or_else(|| from_git("user.email"))
            .context("No committer email: pass --committer-email or set git user.email")?;

        Ok(User::new(name, email))
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    let owner = cli.owner()?;
    let registry = LocalCargoRegistry::open(&config).context("Failed to open registry storage")?;

    match &cli.command {
        Commands::Init => {
            let repository = registry.index().ensure_initialized(&cli.committer()?, &owner)?;
            println!("Index repository ready at {}", repository.path.display());
        }

        Commands::Rebuild => {
            registry.index().rebuild_full_index(&cli.committer()?, &owner)?;
            println!("Rebuilt cargo index of '{}'", owner.name);
        }

        Commands::WriteConfig => {
            registry.index().write_config(&cli.committer()?, &owner)?;
            println!("Updated config.json of '{}'", owner.name);
        }

        Commands::Publish { payload } => {
            let file = File::open(payload)
                .with_context(|| format!("Failed to open payload {payload:?}"))?;
            let created = registry.upload_package(&cli.committer()?, &owner, BufReader::new(file))?;
            println!(
                "Published {} {}",
                created.package.name, created.version.version
            );
        }

        Commands::Yank { name, version } => {
            registry.yank(&cli.committer()?, &owner, name, version)?;
            println!("Yanked {name} {version}");
        }

        Commands::Unyank { name, version } => {
            registry.unyank(&cli.committer()?, &owner, name, version)?;
            println!("Unyanked {name} {version}");
        }

        Commands::Show { name } => match registry.index().read_package_index(&owner, name)? {
            Some(entries) => {
                for entry in entries {
                    println!("{}", serde_json::to_string(&entry)?);
                }
            }
            None => anyhow::bail!("No index file for '{name}'"),
        },
    }

    Ok(())
}
