//! Application-level configuration loading, including match phase timing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/scout-deck.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOUT_DECK_CONFIG";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Countdown length for the autonomous phase, in seconds.
    pub autonomous_secs: u64,
    /// Length of the transition period between autonomous and teleop, in seconds.
    pub transition_secs: u64,
    /// Length of one alliance-shift period, in seconds. Teleop contains four.
    pub alliance_shift_secs: u64,
    /// Length of the end-game period, in seconds.
    pub end_game_secs: u64,
    /// Maximum number of queue slots consumed when a match starts.
    pub max_active_slots: usize,
    /// How long a first cancel click stays armed before disarming, in seconds.
    pub cancel_confirm_secs: u64,
    /// Whether any lead may end a match, or only the lead who started it.
    pub any_lead_may_end: bool,
    /// Upper bound on the store write backing a session submission, in seconds.
    pub submit_timeout_secs: u64,
    /// How many ended matches the review listing returns by default.
    pub recent_matches_limit: usize,
    /// TCP port the server listens on unless overridden by environment.
    pub port: u16,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        autonomous_secs = app_config.autonomous_secs,
                        teleop_secs = app_config.teleop_reference_secs(),
                        slots = app_config.max_active_slots,
                        "loaded match timing from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Combined teleop countdown: transition, four alliance shifts, then end game.
    ///
    /// A single reference countdown rather than four separate phases; the scout
    /// advances phases manually regardless of where the clock sits.
    pub fn teleop_reference_secs(&self) -> u64 {
        self.transition_secs + 4 * self.alliance_shift_secs + self.end_game_secs
    }

    /// Cancel confirmation window as a [`Duration`].
    pub fn cancel_confirm_window(&self) -> Duration {
        Duration::from_secs(self.cancel_confirm_secs)
    }

    /// Submission timeout as a [`Duration`].
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every field is optional; absent fields take the built-in competition timing.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    autonomous_secs: Option<u64>,
    transition_secs: Option<u64>,
    alliance_shift_secs: Option<u64>,
    end_game_secs: Option<u64>,
    max_active_slots: Option<usize>,
    cancel_confirm_secs: Option<u64>,
    any_lead_may_end: Option<bool>,
    submit_timeout_secs: Option<u64>,
    recent_matches_limit: Option<usize>,
    port: Option<u16>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            autonomous_secs: value.autonomous_secs.unwrap_or(20),
            transition_secs: value.transition_secs.unwrap_or(10),
            alliance_shift_secs: value.alliance_shift_secs.unwrap_or(25),
            end_game_secs: value.end_game_secs.unwrap_or(30),
            max_active_slots: value.max_active_slots.unwrap_or(6),
            cancel_confirm_secs: value.cancel_confirm_secs.unwrap_or(3),
            any_lead_may_end: value.any_lead_may_end.unwrap_or(true),
            submit_timeout_secs: value.submit_timeout_secs.unwrap_or(5),
            recent_matches_limit: value.recent_matches_limit.unwrap_or(25),
            port: value.port.unwrap_or(8080),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
