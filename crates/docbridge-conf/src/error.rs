//! Configuration error types

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while reading connection settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	/// A required variable is not set (or is empty)
	#[error("Missing required setting: {0}")]
	Missing(String),

	/// A variable is set but cannot be interpreted
	#[error("Invalid value {value:?} for {var}: {reason}")]
	Invalid {
		var: String,
		value: String,
		reason: String,
	},
}
