//! Reduction configuration loading.

use anyhow::{Context, Result};
use std::path::Path;
use svo_core::ReductionConfig;

/// Load a reduction configuration; without a path every default applies.
pub fn load(path: Option<&Path>) -> Result<ReductionConfig> {
	let config = match path {
		Some(path) => {
			let content = std::fs::read_to_string(path)
				.with_context(|| format!("Failed to read config file: {}", path.display()))?;
			parse(&content).with_context(|| format!("Invalid config: {}", path.display()))?
		}
		None => ReductionConfig::default(),
	};
	Ok(config)
}

/// Parse and validate a TOML configuration.
pub fn parse(content: &str) -> Result<ReductionConfig> {
	let config: ReductionConfig = toml::from_str(content).context("Failed to parse config TOML")?;
	config.validate()?;
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use svo_core::RotationAxis;

	#[test]
	fn test_empty_config_is_default() {
		assert_eq!(parse("").unwrap(), ReductionConfig::default());
	}

	#[test]
	fn test_partial_config() {
		let config = parse(
			r#"
			threshold_reduce_low = 10.0
			levels = 6
			active_axis = "omega"

			[corrections]
			lorentz = false

			[offsets]
			kappa = 0.25
			"#,
		)
		.unwrap();
		assert_eq!(config.threshold_reduce_low, 10.0);
		assert_eq!(config.levels, Some(6));
		assert_eq!(config.active_axis, RotationAxis::Omega);
		assert!(!config.corrections.lorentz);
		assert!(config.corrections.polarization);
		assert_eq!(config.offsets.kappa, 0.25);
		assert_eq!(config.brick_inner_dimension, 7);
	}

	#[test]
	fn test_out_of_range_rejected() {
		assert!(parse("levels = 20").is_err());
		assert!(parse("brick_pool_power = 0").is_err());
	}

	#[test]
	fn test_unknown_axis_rejected() {
		assert!(parse(r#"active_axis = "chi""#).is_err());
	}

	#[test]
	fn test_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
		assert_eq!(load(None).unwrap(), ReductionConfig::default());
	}
}
