use std::path::Path;

use anyhow::Context;

use parley_crypto::{ServerKey, UserKey};
use parley_types::config::ClientConfigFile;

#[derive(Debug)]
pub struct ClientSettings {
    /// `host:port` of the relay.
    pub server: String,
    pub server_key: ServerKey,
    pub user_key: UserKey,
}

impl ClientSettings {
    pub fn url(&self) -> String {
        format!("ws://{}/", self.server)
    }
}

pub fn load(path: &Path) -> anyhow::Result<ClientSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<ClientSettings> {
    let file: ClientConfigFile = serde_json::from_str(raw).context("config is not valid JSON")?;
    Ok(ClientSettings {
        server: file.server,
        server_key: ServerKey::from_hex(&file.server_key).context("invalid server_key")?,
        user_key: UserKey::from_hex(&file.private_key).context("invalid private_key")?,
    })
}
