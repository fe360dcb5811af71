// Configuration loading and parsing (config/venue.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// venue.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire venue.toml file.
#[derive(Debug, Clone, Deserialize)]
struct VenueFile {
    venue: VenueConfig,
    #[serde(default)]
    database: Option<DatabaseSection>,
    #[serde(default)]
    drinks: Option<Vec<Drink>>,
}

/// The `[venue]` table: fees and court count.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// Flat per-head court fee for the whole session, in VND.
    pub court_fee: f64,
    /// Shuttlecock fee per match, split across the losing team, in VND.
    pub shuttlecock_fee_per_match: f64,
    pub num_courts: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// One item on the drinks menu.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Drink {
    pub id: String,
    pub name: String,
    pub price: f64,
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub venue: VenueConfig,
    pub drinks: Vec<Drink>,
    pub db_path: String,
}

impl Default for Config {
    /// The built-in venue: 7 courts, 15 000 ₫ court fee, 28 000 ₫ shuttlecock
    /// fee per match, and the standard three-item drinks menu.
    fn default() -> Self {
        Config {
            venue: VenueConfig {
                court_fee: 15000.0,
                shuttlecock_fee_per_match: 28000.0,
                num_courts: 7,
            },
            drinks: vec![
                Drink {
                    id: "tra-duong".to_string(),
                    name: "Trà đường".to_string(),
                    price: 12000.0,
                },
                Drink {
                    id: "nuoc-chai".to_string(),
                    name: "Nước chai".to_string(),
                    price: 15000.0,
                },
                Drink {
                    id: "nuoc-suoi".to_string(),
                    name: "Nước suối".to_string(),
                    price: 5000.0,
                },
            ],
            db_path: "shuttlebill.db".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/venue.toml` relative to the
/// given `base_dir`. A missing file is not an error: the built-in defaults
/// are used so the tool works out of the box.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let venue_path = base_dir.join("config").join("venue.toml");
    if !venue_path.exists() {
        return Ok(Config::default());
    }

    let text =
        std::fs::read_to_string(&venue_path).map_err(|_| ConfigError::FileNotFound {
            path: venue_path.clone(),
        })?;
    let file: VenueFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: venue_path.clone(),
        source: e,
    })?;

    let defaults = Config::default();
    let config = Config {
        venue: file.venue,
        drinks: file.drinks.unwrap_or(defaults.drinks),
        db_path: file.database.map(|d| d.path).unwrap_or(defaults.db_path),
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.venue.court_fee <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "venue.court_fee".into(),
            message: format!("must be > 0, got {}", config.venue.court_fee),
        });
    }

    if config.venue.shuttlecock_fee_per_match <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "venue.shuttlecock_fee_per_match".into(),
            message: format!(
                "must be > 0, got {}",
                config.venue.shuttlecock_fee_per_match
            ),
        });
    }

    if config.venue.num_courts == 0 {
        return Err(ConfigError::ValidationError {
            field: "venue.num_courts".into(),
            message: "must be greater than 0".into(),
        });
    }

    for drink in &config.drinks {
        if drink.price < 0.0 {
            return Err(ConfigError::ValidationError {
                field: format!("drinks.{}.price", drink.id),
                message: format!("must be >= 0, got {}", drink.price),
            });
        }
    }

    // Duplicate drink ids would make tallies ambiguous.
    let mut ids: Vec<&str> = config.drinks.iter().map(|d| d.id.as_str()).collect();
    ids.sort_unstable();
    for pair in ids.windows(2) {
        if pair[0] == pair[1] {
            return Err(ConfigError::ValidationError {
                field: "drinks".into(),
                message: format!("duplicate drink id `{}`", pair[0]),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
