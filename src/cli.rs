use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;

use farc::WalkOptions;

#[derive(Parser)]
#[command(name = "flatar")]
#[command(about = "Pack, unpack and edit flat file archives")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Packs the regular files of a directory into a new archive
    Pack {
        archive: PathBuf,
        src_dir: PathBuf,
    },

    /// Extracts all members of an archive into a directory
    Unpack {
        archive: PathBuf,
        dest_dir: PathBuf,
    },

    /// Appends a file to an archive, unless a member of that name exists
    Add {
        archive: PathBuf,
        file: PathBuf,
    },

    /// Deletes a member from an archive
    Del {
        archive: PathBuf,
        name: OsString,
    },

    /// Lists the members of an archive
    List {
        archive: PathBuf,
    },
}

const DEFAULT_CONFIG: &str = r#"
    symlink = false
    same_fs = true
    buffer_size = 8192
"#;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("buffer_size must be at least 1")]
    BufferSize,
}

// Configuration
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub symlink: bool,
    #[serde(default = "default_same_fs")]
    pub same_fs: bool,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_same_fs() -> bool {
    true
}

fn default_buffer_size() -> usize {
    8 * 1024
}

impl Config {
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content)?;

        if config.buffer_size == 0 {
            return Err(ConfigError::BufferSize);
        }
        Ok(config)
    }

    pub fn load(path: Option<&PathBuf>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                Config::parse(&content)
            }
            None => Config::parse(DEFAULT_CONFIG),
        }
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            follow_links: self.symlink,
            same_fs: self.same_fs,
        }
    }
}
