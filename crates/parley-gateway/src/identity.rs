use parley_crypto::UserKey;
use parley_types::DisplayColor;

/// A configured user. The full set is loaded at startup and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub name: String,
    pub color: DisplayColor,
    pub key: UserKey,
}

impl UserIdentity {
    pub fn new(name: impl Into<String>, color: DisplayColor, key: UserKey) -> Self {
        Self {
            name: name.into(),
            color,
            key,
        }
    }
}
