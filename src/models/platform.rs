//! Platform type definitions

use serde::{Deserialize, Serialize};

/// Supported publishing platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Mastodon (and compatible ActivityPub servers)
    #[default]
    Mastodon,
    /// Pixelfed (ActivityPub photo sharing)
    Pixelfed,
    /// Lemmy (federated link aggregator)
    Lemmy,
    /// Bluesky (AT Protocol)
    Bluesky,
}

impl Platform {
    /// Get all supported platforms
    pub const fn all() -> &'static [Self] {
        &[Self::Mastodon, Self::Pixelfed, Self::Lemmy, Self::Bluesky]
    }

    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mastodon => "Mastodon",
            Self::Pixelfed => "Pixelfed",
            Self::Lemmy => "Lemmy",
            Self::Bluesky => "Bluesky",
        }
    }

    /// Get the emoji icon
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Mastodon => "🐘",
            Self::Pixelfed => "📷",
            Self::Lemmy => "🐭",
            Self::Bluesky => "🦋",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mastodon" | "masto" => Some(Self::Mastodon),
            "pixelfed" | "pixel" => Some(Self::Pixelfed),
            "lemmy" => Some(Self::Lemmy),
            "bluesky" | "bsky" => Some(Self::Bluesky),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Platform::from_str("masto"), Some(Platform::Mastodon));
        assert_eq!(Platform::from_str("BSKY"), Some(Platform::Bluesky));
        assert_eq!(Platform::from_str("pixelfed"), Some(Platform::Pixelfed));
        assert_eq!(Platform::from_str("friendica"), None);
    }

    #[test]
    fn test_display_matches_name() {
        assert_eq!(Platform::Pixelfed.to_string(), "Pixelfed");
        assert_eq!(Platform::all().len(), 4);
    }
}
