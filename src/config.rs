//! Process configuration for the limiter, token lifetimes, and storage deadline.
//!
//! Every field has a default, so an empty JSON object is a complete configuration.

// self
use crate::{_prelude::*, error::ConfigError};

/// Top-level settings consumed when wiring a [`Gatekeeper`](crate::gate::Gatekeeper).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
	/// Per-client token bucket settings.
	pub limiter: LimiterConfig,
	/// Token lifetimes per scope.
	pub tokens: TokenConfig,
	/// Upper bound on each storage call, in milliseconds.
	pub storage_deadline_ms: u64,
}
impl GateConfig {
	/// Parses a JSON document, reporting the offending path on failure, and validates it.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Rejects settings the gate cannot run with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.limiter.validate()?;
		self.tokens.validate()?;

		if self.storage_deadline_ms == 0 {
			return Err(ConfigError::ZeroDeadline);
		}

		Ok(())
	}

	/// Storage deadline as a [`StdDuration`].
	pub fn storage_deadline(&self) -> StdDuration {
		StdDuration::from_millis(self.storage_deadline_ms)
	}
}
impl Default for GateConfig {
	fn default() -> Self {
		Self {
			limiter: LimiterConfig::default(),
			tokens: TokenConfig::default(),
			storage_deadline_ms: 3_000,
		}
	}
}

/// Token bucket parameters shared by every client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimiterConfig {
	/// When `false`, every request is admitted and no state is kept.
	pub enabled: bool,
	/// Sustained refill rate in tokens per second.
	pub rps: f64,
	/// Bucket capacity.
	pub burst: u32,
	/// Seconds between idle sweeps; entries idle for three intervals are evicted.
	pub sweep_interval_secs: u64,
}
impl LimiterConfig {
	/// Sweep runs this many intervals behind the last request before evicting an entry.
	pub const IDLE_INTERVALS: u32 = 3;

	/// Validates rate, burst, and sweep interval.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.rps.is_finite() || self.rps < 0.0 {
			return Err(ConfigError::InvalidLimiter {
				reason: "rps must be finite and non-negative",
			});
		}
		if self.burst < 1 {
			return Err(ConfigError::InvalidLimiter { reason: "burst must be at least 1" });
		}
		if self.sweep_interval_secs == 0 {
			return Err(ConfigError::InvalidLimiter { reason: "sweep interval must be positive" });
		}

		Ok(())
	}

	/// Period between sweeps.
	pub fn sweep_interval(&self) -> StdDuration {
		StdDuration::from_secs(self.sweep_interval_secs)
	}

	/// Idle time after which a sweep evicts an entry.
	pub fn idle_threshold(&self) -> Duration {
		let secs = self.sweep_interval_secs.saturating_mul(Self::IDLE_INTERVALS.into());

		Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
	}
}
impl Default for LimiterConfig {
	fn default() -> Self {
		Self { enabled: true, rps: 2.0, burst: 4, sweep_interval_secs: 60 }
	}
}

/// Lifetimes applied when tokens are issued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenConfig {
	/// Activation token lifetime in seconds.
	pub activation_ttl_secs: i64,
	/// Authentication token lifetime in seconds.
	pub authentication_ttl_secs: i64,
}
impl TokenConfig {
	/// Longest accepted lifetime for either scope: one year.
	pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

	/// Rejects lifetimes that are not positive or exceed [`Self::MAX_TTL_SECS`].
	pub fn validate(&self) -> Result<(), ConfigError> {
		Self::check_ttl(self.activation_ttl_secs, "activation token lifetime")?;
		Self::check_ttl(self.authentication_ttl_secs, "authentication token lifetime")
	}

	fn check_ttl(secs: i64, field: &'static str) -> Result<(), ConfigError> {
		if secs <= 0 {
			return Err(ConfigError::NonPositiveTtl { field });
		}
		if secs > Self::MAX_TTL_SECS {
			return Err(ConfigError::TtlTooLong { field, max_secs: Self::MAX_TTL_SECS });
		}

		Ok(())
	}

	/// Activation token lifetime.
	pub fn activation_ttl(&self) -> Duration {
		Duration::seconds(self.activation_ttl_secs)
	}

	/// Authentication token lifetime.
	pub fn authentication_ttl(&self) -> Duration {
		Duration::seconds(self.authentication_ttl_secs)
	}
}
impl Default for TokenConfig {
	fn default() -> Self {
		Self { activation_ttl_secs: 3 * 24 * 60 * 60, authentication_ttl_secs: 24 * 60 * 60 }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = GateConfig::from_json_str("{}").expect("Empty config should parse.");

		assert_eq!(config, GateConfig::default());
		assert_eq!(config.limiter.rps, 2.0);
		assert_eq!(config.limiter.burst, 4);
		assert_eq!(config.limiter.idle_threshold(), Duration::minutes(3));
		assert_eq!(config.tokens.activation_ttl(), Duration::days(3));
		assert_eq!(config.storage_deadline(), StdDuration::from_secs(3));
	}

	#[test]
	fn parse_errors_name_the_offending_path() {
		let err = GateConfig::from_json_str(r#"{"limiter":{"burst":"four"}}"#)
			.expect_err("A string burst should fail to parse.");

		assert!(err.to_string().contains("limiter.burst"), "Unexpected message: {err}");
	}

	#[test]
	fn invalid_values_are_rejected() {
		let err = GateConfig::from_json_str(r#"{"limiter":{"burst":0}}"#)
			.expect_err("A zero burst should be rejected.");

		assert!(matches!(err, ConfigError::InvalidLimiter { .. }));

		let err = GateConfig::from_json_str(r#"{"tokens":{"authentication_ttl_secs":0}}"#)
			.expect_err("A zero lifetime should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveTtl { .. }));

		let err = GateConfig::from_json_str(r#"{"storage_deadline_ms":0}"#)
			.expect_err("A zero deadline should be rejected.");

		assert!(matches!(err, ConfigError::ZeroDeadline));

		let limiter = LimiterConfig { rps: f64::NAN, ..Default::default() };

		assert!(limiter.validate().is_err());
	}

	#[test]
	fn oversized_lifetimes_are_rejected() {
		let err = GateConfig::from_json_str(
			r#"{"tokens":{"activation_ttl_secs":1000000000000000}}"#,
		)
		.expect_err("A lifetime past the maximum should be rejected.");

		assert!(matches!(
			err,
			ConfigError::TtlTooLong { field: "activation token lifetime", .. }
		));

		let at_limit = TokenConfig {
			authentication_ttl_secs: TokenConfig::MAX_TTL_SECS,
			..Default::default()
		};

		assert!(at_limit.validate().is_ok());
	}
}
