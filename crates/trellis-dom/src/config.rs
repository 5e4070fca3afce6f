//! Render root configuration.
//!
//! Every section is optional; missing keys fall back to defaults.
//!
//! ```toml
//! [hydration]
//! strategy = "adaptive"   # full | selective | progressive | resumable | adaptive
//!
//! [diff]
//! keyed = true
//!
//! [channel]
//! settle_timeout_ms = 2000
//!
//! [delegation]
//! event_types = ["click", "input"]
//! ```

use crate::error::ConfigError;
use crate::hydration::HydrationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use trellis_core::hydration::HydrationStrategy;
use trellis_reconciler::DiffOptions;

/// Default upper bound for [`Root::settle`](crate::Root::settle).
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
	pub hydration: HydrationSettings,
	pub diff: DiffOptions,
	pub channel: ChannelSettings,
	pub delegation: DelegationSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationSettings {
	pub strategy: StrategySetting,
}

/// Strategy name as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySetting {
	#[default]
	Full,
	Selective,
	Progressive,
	Resumable,
	Adaptive,
}

impl StrategySetting {
	pub fn to_config(self) -> HydrationConfig {
		match self {
			StrategySetting::Full => HydrationStrategy::Full.into(),
			StrategySetting::Selective => HydrationStrategy::Selective.into(),
			StrategySetting::Progressive => HydrationStrategy::Progressive.into(),
			StrategySetting::Resumable => HydrationStrategy::Resumable.into(),
			StrategySetting::Adaptive => HydrationConfig::Adaptive,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
	pub settle_timeout_ms: u64,
}

impl Default for ChannelSettings {
	fn default() -> Self {
		Self {
			settle_timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
		}
	}
}

impl ChannelSettings {
	pub fn settle_timeout(&self) -> Duration {
		Duration::from_millis(self.settle_timeout_ms)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationSettings {
	/// Event types delegated on the container in addition to those
	/// discovered from ownership markers.
	pub event_types: Vec<String>,
}

impl RootConfig {
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config = Self::from_toml_str(&content)?;
		tracing::debug!(path = %path.display(), "loaded root configuration");
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_empty_source_yields_defaults() {
		// Act
		let config = RootConfig::from_toml_str("").unwrap();

		// Assert
		assert_eq!(config, RootConfig::default());
		assert_eq!(config.channel.settle_timeout(), Duration::from_secs(5));
		assert!(!config.diff.keyed);
	}

	#[rstest]
	fn test_sections_parse() {
		// Arrange
		let source = r#"
			[hydration]
			strategy = "progressive"

			[diff]
			keyed = true

			[channel]
			settle_timeout_ms = 250

			[delegation]
			event_types = ["click", "input"]
		"#;

		// Act
		let config = RootConfig::from_toml_str(source).unwrap();

		// Assert
		assert_eq!(config.hydration.strategy, StrategySetting::Progressive);
		assert!(config.diff.keyed);
		assert_eq!(config.channel.settle_timeout_ms, 250);
		assert_eq!(config.delegation.event_types, vec!["click", "input"]);
	}

	#[rstest]
	fn test_unknown_strategy_is_rejected() {
		let result = RootConfig::from_toml_str("[hydration]\nstrategy = \"eager\"\n");
		assert!(matches!(result, Err(ConfigError::Toml(_))));
	}

	#[rstest]
	fn test_missing_file_reports_path() {
		let result = RootConfig::from_file("/nonexistent/trellis.toml");
		assert!(matches!(result, Err(ConfigError::Io { .. })));
	}
}
