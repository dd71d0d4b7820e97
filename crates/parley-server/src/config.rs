use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, bail};
use tracing::warn;

use parley_crypto::{ServerKey, UserKey};
use parley_gateway::UserIdentity;
use parley_types::config::ServerConfigFile;

/// A validated deployment: everything the relay needs to start.
#[derive(Debug)]
pub struct ServerSettings {
    pub listen: String,
    pub server_key: ServerKey,
    /// In the order the file lists them; authentication probes in this order.
    pub identities: Vec<UserIdentity>,
}

pub fn load(path: &Path) -> anyhow::Result<ServerSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<ServerSettings> {
    let file: ServerConfigFile = serde_json::from_str(raw).context("config is not valid JSON")?;

    let server_key = ServerKey::from_hex(&file.key).context("invalid server key")?;

    if file.users.is_empty() {
        bail!("config lists no users");
    }

    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    let mut identities = Vec::with_capacity(file.users.len());
    for user in file.users {
        if !names.insert(user.name.clone()) {
            bail!("duplicate user name '{}'", user.name);
        }
        let key = UserKey::from_hex(&user.key)
            .with_context(|| format!("invalid key for user '{}'", user.name))?;
        if !keys.insert(*key.as_bytes()) {
            // Trial decryption will always bind the earlier entry.
            warn!("user '{}' shares a key with an earlier user", user.name);
        }
        identities.push(UserIdentity::new(user.name, user.color, key));
    }

    Ok(ServerSettings {
        listen: file.listen,
        server_key,
        identities,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use parley_types::DisplayColor;

    use super::*;

    const SERVER_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const ALICE_KEY: &str = "a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1b2b3b4b5b6b7";
    const BOB_KEY: &str = "b0b1b2b3b4b5b6b7b8b9babbbcbdbebfc0c1c2c3c4c5c6c7";

    fn document(users: &str) -> String {
        format!(r#"{{ "listen": "127.0.0.1:8080", "key": "{SERVER_KEY}", "users": [{users}] }}"#)
    }

    fn entry(name: &str, color: &str, key: &str) -> String {
        format!(r#"{{ "name": "{name}", "color": "{color}", "key": "{key}" }}"#)
    }

    fn error_text(raw: &str) -> String {
        format!("{:#}", parse(raw).unwrap_err())
    }

    #[test]
    fn loads_users_in_file_order() {
        let raw = document(&format!(
            "{}, {}",
            entry("bob", "green", BOB_KEY),
            entry("alice", "blue", ALICE_KEY)
        ));
        let settings = parse(&raw).unwrap();

        assert_eq!(settings.listen, "127.0.0.1:8080");
        assert_eq!(settings.server_key.to_hex(), SERVER_KEY);
        let names: Vec<&str> = settings.identities.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["bob", "alice"]);
        assert_eq!(settings.identities[1].color, DisplayColor::Blue);
        assert_eq!(settings.identities[1].key.to_hex(), ALICE_KEY);
    }

    #[test]
    fn short_user_key_names_the_user_and_length() {
        let raw = document(&entry("alice", "blue", "a0a1a2a3"));
        let text = error_text(&raw);
        assert!(text.contains("'alice'"), "{text}");
        assert!(text.contains("got 4"), "{text}");
    }

    #[test]
    fn non_hex_user_key_is_rejected() {
        let bad = "zz".repeat(24);
        let raw = document(&entry("alice", "blue", &bad));
        assert!(error_text(&raw).contains("'alice'"));
    }

    #[test]
    fn bad_server_key_is_rejected() {
        let raw = document(&entry("alice", "blue", ALICE_KEY)).replace(SERVER_KEY, "abcd");
        let text = error_text(&raw);
        assert!(text.contains("server key"), "{text}");
        assert!(text.contains("got 2"), "{text}");
    }

    #[test]
    fn unknown_color_is_rejected() {
        let raw = document(&entry("alice", "purple", ALICE_KEY));
        assert!(error_text(&raw).contains("purple"));
    }

    #[test]
    fn empty_user_list_is_rejected() {
        assert!(error_text(&document("")).contains("no users"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let raw = document(&format!(
            "{}, {}",
            entry("alice", "blue", ALICE_KEY),
            entry("alice", "red", BOB_KEY)
        ));
        assert!(error_text(&raw).contains("duplicate user name 'alice'"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(error_text("{ not json").contains("not valid JSON"));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(document(&entry("alice", "blue", ALICE_KEY)).as_bytes())
            .unwrap();

        let settings = load(file.path()).unwrap();
        assert_eq!(settings.identities.len(), 1);
        assert_eq!(settings.identities[0].name, "alice");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let text = format!("{:#}", load(&path).unwrap_err());
        assert!(text.contains("failed to read config file"), "{text}");
    }

    #[test]
    fn load_names_the_file_on_invalid_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(document("").as_bytes()).unwrap();
        let text = format!("{:#}", load(file.path()).unwrap_err());
        assert!(text.contains("invalid config file"), "{text}");
        assert!(text.contains("no users"), "{text}");
    }
}
