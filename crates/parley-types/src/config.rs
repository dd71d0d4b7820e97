//! On-disk configuration shapes. Keys stay hex strings here; validation and
//! decoding happen in the binaries that load these files.

use serde::Deserialize;

use crate::color::DisplayColor;

/// Server deployment file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfigFile {
    pub listen: String,
    /// 32-byte server key, hex.
    pub key: String,
    /// Probe order for authentication follows this list.
    #[serde(alias = "Users")]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub color: DisplayColor,
    /// 24-byte user key, hex.
    pub key: String,
}

/// Client file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfigFile {
    /// `host:port` of the relay.
    pub server: String,
    pub server_key: String,
    pub private_key: String,
}
