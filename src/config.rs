//! Monitor presets: the user-adjustable knobs, persisted as JSON.

use crate::CrtResult;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// A monitor preset. Missing fields fall back to the defaults, so a preset
/// file only needs the knobs it changes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct CrtConfig {
    pub hue: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub black_point: i32,
    pub white_point: i32,
    pub blend: bool,
    pub scanlines: i32,
}

impl Default for CrtConfig {
    fn default() -> Self {
        Self {
            hue: 0,
            brightness: 0,
            contrast: 180,
            saturation: 10,
            black_point: 0,
            white_point: 100,
            blend: false,
            scanlines: 0,
        }
    }
}

impl CrtConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> CrtResult<Self> {
        let path = path.as_ref();
        let file =
            BufReader::new(File::open(path).with_context(|| format!("`{}`", path.display()))?);
        let config = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_preset_keeps_defaults() {
        let config: CrtConfig = serde_json::from_str(r#"{"contrast":200,"blend":true}"#).unwrap();
        assert_eq!(config.contrast, 200);
        assert!(config.blend);
        assert_eq!(config.saturation, 10);
        assert_eq!(config.white_point, 100);
    }

    #[test]
    fn preset_round_trips() {
        let config = CrtConfig {
            hue: 90,
            scanlines: 1,
            ..CrtConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<CrtConfig>(&json).unwrap(), config);
    }
}
