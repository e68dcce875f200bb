use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized customer key: the digits of the sender's phone id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Strips the transport suffix (`@c.us`, `@s.whatsapp.net`), any device pairing suffix
    /// (`:12`) and every non-digit character.
    pub fn normalize(raw_id: &str) -> Self {
        let without_domain = raw_id.split('@').next().unwrap_or_default();
        let without_device = without_domain.split(':').next().unwrap_or_default();
        Self(without_device.chars().filter(char::is_ascii_digit).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
