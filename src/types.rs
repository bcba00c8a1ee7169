//! Common types used throughout gridload
//!
//! Shared enums for request methods, retry backoff, series selection,
//! extraction detail, and the games/market modes exposed on the CLI.

use serde::{Deserialize, Serialize};

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Series Selection
// ============================================================================

/// How the walker decides which series to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Keep only series whose state shows at least one played game
    #[default]
    Smart,
    /// Keep the first N series in remote order, played or not
    Recent,
}

impl SelectionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionPolicy::Smart => "smart",
            SelectionPolicy::Recent => "recent",
        }
    }
}

/// Which tables the extractor produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// Series summaries only
    Summary,
    /// Series summaries and per-game rows
    Games,
    /// Everything, including per-player stats and aggregates
    #[default]
    Full,
}

impl DetailLevel {
    pub fn includes_games(self) -> bool {
        matches!(self, DetailLevel::Games | DetailLevel::Full)
    }

    pub fn includes_players(self) -> bool {
        matches!(self, DetailLevel::Full)
    }
}

// ============================================================================
// Games
// ============================================================================

/// Titles known to the central data API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    #[default]
    Dota2,
    Csgo,
    Cs2,
}

impl Game {
    /// Title id used in the `allSeries` filter
    pub fn title_id(self) -> u32 {
        match self {
            Game::Dota2 => 2,
            Game::Csgo => 1,
            Game::Cs2 => 28,
        }
    }

    /// Display name used for manually listed series
    pub fn display_name(self) -> &'static str {
        match self {
            Game::Dota2 => "Dota 2",
            Game::Csgo => "CS:GO",
            Game::Cs2 => "Counter Strike 2",
        }
    }

    /// Prefix for output file names
    pub fn file_prefix(self) -> &'static str {
        match self {
            Game::Dota2 => "dota2",
            Game::Csgo => "csgo",
            Game::Cs2 => "cs2",
        }
    }
}

// ============================================================================
// Market Mode
// ============================================================================

/// Which market data to pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MarketMode {
    /// Configured item ids in one region
    Specific,
    /// Every item in one region
    All,
    /// Every item in each of the default trade hubs
    #[default]
    AllA4eRegions,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_conversion() {
        let get: reqwest::Method = Method::GET.into();
        assert_eq!(reqwest::Method::GET, get);
        let post: reqwest::Method = Method::POST.into();
        assert_eq!(reqwest::Method::POST, post);
    }

    #[test]
    fn test_selection_policy_serde() {
        let policy: SelectionPolicy = serde_json::from_str("\"recent\"").unwrap();
        assert_eq!(policy, SelectionPolicy::Recent);
        assert_eq!(SelectionPolicy::default(), SelectionPolicy::Smart);
    }

    #[test]
    fn test_game_title_ids() {
        assert_eq!(Game::Dota2.title_id(), 2);
        assert_eq!(Game::Csgo.title_id(), 1);
        assert_eq!(Game::Cs2.title_id(), 28);
        let game: Game = serde_yaml::from_str("cs2").unwrap();
        assert_eq!(game, Game::Cs2);
    }

    #[test]
    fn test_detail_level_inclusion() {
        assert!(!DetailLevel::Summary.includes_games());
        assert!(DetailLevel::Games.includes_games());
        assert!(!DetailLevel::Games.includes_players());
        assert!(DetailLevel::Full.includes_players());
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("key".to_string()).none_if_empty(),
            Some("key".to_string())
        );
        assert_eq!(Some("  ".to_string()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
    }
}
