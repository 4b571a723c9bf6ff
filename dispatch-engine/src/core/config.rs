use shared::delivery::LatLon;
use std::path::PathBuf;
use std::str::FromStr;

/// Engine configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (a `.env` file in the
/// working directory is honoured):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATA_DIR | /var/lib/dispatch | redb files (`packing.redb`, `routes.redb`) |
/// | ENVIRONMENT | development | development / staging / production |
/// | LOG_LEVEL | info | tracing filter when RUST_LOG is unset |
/// | LOG_JSON | false | JSON console/file logs |
/// | LOG_DIR | (unset) | enables daily rolling log files |
/// | DEPOT_LAT / DEPOT_LON | 0.0 / 0.0 | route origin |
/// | TWO_OPT_MAX_PASSES | 8 | bound on 2-opt improvement passes |
/// | ROUTER_AVERAGE_SPEED_KMH | 30 | straight-line router duration estimate |
/// | REOPTIMIZE_PER_DRIVER | false | re-sequence each driver's stops independently |
/// | LOW_STOCK_THRESHOLD | 0 | remaining stock that raises a LOW_STOCK warning |
/// | PACKING_PIN_HASH | (unset) | argon2 PHC hash; when set, quantity edits need a PIN |
///
/// # Example
///
/// ```ignore
/// DATA_DIR=/data/dispatch DEPOT_LAT=40.41 DEPOT_LON=-3.70 cargo test
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the redb files
    pub data_dir: PathBuf,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// Every route starts here
    pub depot: LatLon,
    pub sequencer: SequencerConfig,
    pub packing: PackingConfig,
}

/// Route sequencing knobs
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Upper bound on full 2-opt passes over the tour
    pub max_two_opt_passes: usize,
    /// Used by the straight-line router to estimate durations
    pub average_speed_kmh: f64,
    /// Rank each driver's stops by an independent optimization instead of
    /// inheriting the global relative order
    pub reoptimize_per_driver: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_two_opt_passes: 8,
            average_speed_kmh: 30.0,
            reoptimize_per_driver: false,
        }
    }
}

/// Packing state machine knobs
#[derive(Debug, Clone, Default)]
pub struct PackingConfig {
    /// Remaining stock at or below this raises a LOW_STOCK warning
    pub low_stock_threshold: i32,
    /// argon2 PHC string; `Some` enables the PIN policy
    pub pin_hash: Option<String>,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Missing or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "/var/lib/dispatch".into())
                .into(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_parse("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            depot: LatLon::new(env_parse("DEPOT_LAT", 0.0), env_parse("DEPOT_LON", 0.0)),
            sequencer: SequencerConfig {
                max_two_opt_passes: env_parse("TWO_OPT_MAX_PASSES", 8),
                average_speed_kmh: env_parse("ROUTER_AVERAGE_SPEED_KMH", 30.0),
                reoptimize_per_driver: env_parse("REOPTIMIZE_PER_DRIVER", false),
            },
            packing: PackingConfig {
                low_stock_threshold: env_parse("LOW_STOCK_THRESHOLD", 0),
                pin_hash: std::env::var("PACKING_PIN_HASH")
                    .ok()
                    .filter(|h| !h.is_empty()),
            },
        }
    }

    /// Override the data directory and depot
    ///
    /// Mostly used by tests
    pub fn with_overrides(data_dir: impl Into<PathBuf>, depot: LatLon) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config.depot = depot;
        config
    }

    pub fn packing_db_path(&self) -> PathBuf {
        self.data_dir.join("packing.redb")
    }

    pub fn routes_db_path(&self) -> PathBuf {
        self.data_dir.join("routes.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_overrides_sets_paths() {
        let config = Config::with_overrides("/tmp/dispatch-test", LatLon::new(40.0, -3.0));
        assert_eq!(
            config.packing_db_path(),
            PathBuf::from("/tmp/dispatch-test/packing.redb")
        );
        assert_eq!(
            config.routes_db_path(),
            PathBuf::from("/tmp/dispatch-test/routes.redb")
        );
        assert_eq!(config.depot, LatLon::new(40.0, -3.0));
    }

    #[test]
    fn test_sequencer_defaults() {
        let seq = SequencerConfig::default();
        assert_eq!(seq.max_two_opt_passes, 8);
        assert!(!seq.reoptimize_per_driver);
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        // Unset key
        assert_eq!(env_parse("DISPATCH_TEST_UNSET_KEY_X", 5usize), 5);
    }
}
