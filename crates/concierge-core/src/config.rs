//! Concierge configuration loaded from file and environment.

use crate::actuation::DEFAULT_FRAME_ID;
use crate::echo::DEFAULT_ECHO_MARGIN_SECS;
use crate::error::ConciergeResult;
use crate::feeds::{DEFAULT_BEARING_CONFIDENCE_THRESHOLD, DEFAULT_MAX_RANGE_M};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DIALOG_URL: &str = "http://127.0.0.1:8000/";
pub const DEFAULT_GREETING: &str = "Hello ! How can I help you ?";
pub const DEFAULT_APOLOGY: &str = "Sorry, I have a problem. Goodbye.";
/// Distance kept between the robot and the user during the dialog, meters.
pub const DEFAULT_APPROACH_STANDOFF_M: f64 = 0.50;

/// Runtime configuration.
///
/// | Key / Env | Default | Description |
/// |-----------|---------|-------------|
/// | dialog_url / CONCIERGE__DIALOG_URL | http://127.0.0.1:8000/ | Dialog service endpoint. |
/// | dialog_timeout_secs / CONCIERGE__DIALOG_TIMEOUT_SECS | unset | Bound on one dialog request; unset waits forever. |
/// | bearing_confidence_threshold | 0.2 | Minimum audio energy for a bearing update. |
/// | approach_standoff_m | 0.5 | Distance kept to the user. |
/// | max_range_m | 5.0 | Sonar readings beyond this are dropped. |
/// | echo_margin_secs | 1.0 | Trailing margin of the echo window. |
/// | greeting | "Hello ! How can I help you ?" | First utterance of every dialog. |
/// | apology | "Sorry, I have a problem. Goodbye." | Spoken when the dialog service fails. |
/// | frame_id | base_footprint | Frame of relative pose goals. |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConciergeConfig {
    pub dialog_url: String,
    #[serde(default)]
    pub dialog_timeout_secs: Option<u64>,
    pub bearing_confidence_threshold: f64,
    pub approach_standoff_m: f64,
    pub max_range_m: f64,
    pub echo_margin_secs: f64,
    pub greeting: String,
    pub apology: String,
    pub frame_id: String,
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            dialog_url: DEFAULT_DIALOG_URL.to_string(),
            dialog_timeout_secs: None,
            bearing_confidence_threshold: DEFAULT_BEARING_CONFIDENCE_THRESHOLD,
            approach_standoff_m: DEFAULT_APPROACH_STANDOFF_M,
            max_range_m: DEFAULT_MAX_RANGE_M,
            echo_margin_secs: DEFAULT_ECHO_MARGIN_SECS,
            greeting: DEFAULT_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            frame_id: DEFAULT_FRAME_ID.to_string(),
        }
    }
}

impl ConciergeConfig {
    /// Load config. Precedence: env `CONCIERGE__*` > file at `CONCIERGE_CONFIG`
    /// (default `config/concierge`, extension optional) > defaults.
    pub fn load() -> ConciergeResult<Self> {
        let path = std::env::var("CONCIERGE_CONFIG").unwrap_or_else(|_| "config/concierge".to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load with an explicit file path. A missing file is not an error; without an
    /// extension, `<path>.toml` is looked up.
    pub fn load_from(path: &Path) -> ConciergeResult<Self> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("dialog_url", defaults.dialog_url)?
            .set_default("bearing_confidence_threshold", defaults.bearing_confidence_threshold)?
            .set_default("approach_standoff_m", defaults.approach_standoff_m)?
            .set_default("max_range_m", defaults.max_range_m)?
            .set_default("echo_margin_secs", defaults.echo_margin_secs)?
            .set_default("greeting", defaults.greeting)?
            .set_default("apology", defaults.apology)?
            .set_default("frame_id", defaults.frame_id)?;

        let built = builder
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("CONCIERGE").separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    pub fn dialog_timeout(&self) -> Option<std::time::Duration> {
        self.dialog_timeout_secs.map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ConciergeConfig::load_from(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.dialog_url, DEFAULT_DIALOG_URL);
        assert_eq!(config.approach_standoff_m, 0.5);
        assert_eq!(config.echo_margin_secs, 1.0);
        assert_eq!(config.bearing_confidence_threshold, 0.2);
        assert_eq!(config.dialog_timeout(), None);
        assert_eq!(config.frame_id, "base_footprint");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("concierge-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("concierge.toml");
        std::fs::write(
            &path,
            "dialog_url = \"http://dialog.local:9000/\"\napproach_standoff_m = 0.8\ndialog_timeout_secs = 15\n",
        )
        .unwrap();

        let config = ConciergeConfig::load_from(&path).unwrap();
        assert_eq!(config.dialog_url, "http://dialog.local:9000/");
        assert_eq!(config.approach_standoff_m, 0.8);
        assert_eq!(config.dialog_timeout(), Some(std::time::Duration::from_secs(15)));
        assert_eq!(config.greeting, DEFAULT_GREETING);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn extension_is_optional() {
        let dir = std::env::temp_dir().join(format!("concierge-config-bare-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("concierge.toml"), "max_range_m = 3.5\n").unwrap();

        let config = ConciergeConfig::load_from(&dir.join("concierge")).unwrap();
        assert_eq!(config.max_range_m, 3.5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = std::env::temp_dir().join(format!("concierge-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("concierge.toml");
        std::fs::write(&path, "approach_standoff_m = \"far\"\n").unwrap();

        let err = ConciergeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::error::ConciergeError::Config(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
