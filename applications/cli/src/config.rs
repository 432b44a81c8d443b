/// Player configuration
use onyx_audio_desktop::SinkConfig;
use onyx_dsp::GainVector;
use onyx_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything the player reads at startup
///
/// ```toml
/// gains = [3.0, 1.5, 0.0, -2.0, 4.0]
///
/// [engine]
/// block_frames = 1024
/// default_volume = 0.7
/// join_timeout_ms = 1500
///
/// [sink]
/// queue_blocks = 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    /// Initial band gains in dB, low to high
    #[serde(default)]
    pub gains: GainVector,
}

impl PlayerConfig {
    /// Load configuration from a file and the environment
    ///
    /// With no explicit path, `onyx.toml` in the working directory is used
    /// if present. `ONYX_`-prefixed variables override file values, with
    /// `__` between nested keys (`ONYX_ENGINE__BLOCK_FRAMES=512`) and a
    /// comma-separated list for `ONYX_GAINS`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path)),
            None => settings.add_source(config::File::with_name("onyx").required(false)),
        };

        // Override with environment variables (prefixed with ONYX_)
        settings = settings.add_source(
            config::Environment::with_prefix("ONYX")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("gains")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.sink.queue_blocks == 0 {
            return Err(ConfigError::Invalid(
                "sink.queue_blocks must be at least 1".to_string(),
            ));
        }

        if self.gains.iter().any(|(_, gain)| !gain.is_finite()) {
            return Err(ConfigError::Invalid("gains must be finite".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = toml_file("");
        let config = PlayerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config, PlayerConfig::default());
        assert_eq!(config.engine.block_frames, 1024);
        assert!(config.gains.is_flat());
    }

    #[test]
    fn file_values_are_read() {
        let file = toml_file(
            r#"
            gains = [3.0, 1.5, 0.0, -2.0, 4.0]

            [engine]
            block_frames = 512
            default_volume = 0.5

            [sink]
            queue_blocks = 8
            "#,
        );
        let config = PlayerConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.engine.block_frames, 512);
        assert_eq!(config.engine.default_volume, 0.5);
        assert_eq!(config.engine.join_timeout_ms, 1500);
        assert_eq!(config.sink.queue_blocks, 8);
        assert_eq!(config.sink.write_timeout_ms, 2000);
        assert_eq!(
            config.gains,
            GainVector::new([3.0, 1.5, 0.0, -2.0, 4.0])
        );
    }

    #[test]
    fn wrong_gain_count_is_rejected() {
        let file = toml_file("gains = [1.0, 2.0]");
        assert!(PlayerConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn invalid_engine_config_is_rejected() {
        let file = toml_file("[engine]\nblock_frames = 0");
        assert!(matches!(
            PlayerConfig::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = PlayerConfig::load(Some(Path::new("/nonexistent/onyx/player.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
