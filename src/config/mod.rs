use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

use comments_core::file::FileConstraints;

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "comment-systems.toml";

const ENV_NAME_API_BASE_URL: &str = "API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    pub session: Session,
    pub attachments: FileConstraints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// File that keeps the bearer token between invocations.
    pub token_file: PathBuf,
}

impl Config {
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let file_path: &Path = file_path.as_ref().map(AsRef::as_ref).unwrap_or_else(|| {
            log::info!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let raw_config = match fs::read_to_string(file_path) {
            Ok(cfg_string) => toml::from_str(&cfg_string)?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    log::info!(
                        "{} not found => load default configuration.",
                        file_path.display()
                    );
                    Ok(raw::Config::default())
                }
                _ => Err(err),
            }?,
        };
        let mut cfg = Self::try_from(raw_config)?;
        cfg.apply_env(|name| env::var(name).ok());
        Ok(cfg)
    }

    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_NAME_API_BASE_URL).filter(|url| !url.trim().is_empty()) {
            log::debug!("Use API base URL from {ENV_NAME_API_BASE_URL}");
            self.api.base_url = url;
        }
    }
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            api,
            session,
            attachments,
        } = from;

        let raw::Api { base_url } = api.unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(anyhow!("No API base URL defined"));
        }
        let api = Api { base_url };

        let raw::Session { token_file } = session.unwrap_or_default();
        let session = Session { token_file };

        let raw::Attachments {
            max_size,
            allowed_types,
        } = attachments.unwrap_or_default();
        let defaults = FileConstraints::default();
        let attachments = FileConstraints {
            max_size: max_size.unwrap_or(defaults.max_size),
            allowed_types: allowed_types.unwrap_or(defaults.allowed_types),
        };
        if attachments.allowed_types.is_empty() {
            return Err(anyhow!("No allowed attachment types defined"));
        }

        Ok(Self {
            api,
            session,
            attachments,
        })
    }
}
