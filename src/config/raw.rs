use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = include_str!("comment-systems.default.toml");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub api: Option<Api>,
    pub session: Option<Session>,
    pub attachments: Option<Attachments>,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_FILE).expect("Default configuration")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Api {
    pub base_url: String,
}

impl Default for Api {
    fn default() -> Self {
        Config::default().api.expect("API configuration")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Session {
    pub token_file: PathBuf,
}

impl Default for Session {
    fn default() -> Self {
        Config::default().session.expect("Session configuration")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Attachments {
    pub max_size: Option<u64>,
    pub allowed_types: Option<Vec<String>>,
}

impl Default for Attachments {
    fn default() -> Self {
        Config::default()
            .attachments
            .expect("Attachments configuration")
    }
}
