use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.touch.threshold_px.is_nan() || self.touch.threshold_px <= 0.0 {
            bail!("touch.threshold_px must be positive");
        }
        if !(0.0..=1.0).contains(&self.pose.visibility_threshold) {
            bail!("pose.visibility_threshold must be within [0, 1]");
        }
        if self.spin.block_size == 0 {
            bail!("spin.block_size must be at least 1");
        }
        if self.spin.min_std_dy.is_nan() || self.spin.min_std_dy <= 0.0 {
            bail!("spin.min_std_dy must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg = Config::from_yaml("touch:\n  threshold_px: 30.0\n").unwrap();
        assert_eq!(cfg.touch.threshold_px, 30.0);
        assert_eq!(cfg.velocity.fps, 30.0);
        assert_eq!(cfg.detection.ball_class_id, 32);
        assert_eq!(cfg.spin.backspin_mean_dy, -1.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_yaml("touch:\n  threshold_px: 0.0\n").is_err());
        assert!(Config::from_yaml("pose:\n  visibility_threshold: 1.5\n").is_err());
        assert!(Config::from_yaml("spin:\n  block_size: 0\n").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::load("/nonexistent/config.yaml").is_err());
    }
}
