//! Camera settings read from an ORB-SLAM style YAML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Subset of the settings file the replay harness cares about.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineSettings {
    #[serde(rename = "Camera.fx")]
    pub fx: f64,
    #[serde(rename = "Camera.fy")]
    pub fy: f64,
    #[serde(rename = "Camera.cx")]
    pub cx: f64,
    #[serde(rename = "Camera.cy")]
    pub cy: f64,
    #[serde(rename = "Camera.width", default)]
    pub width: Option<u32>,
    #[serde(rename = "Camera.height", default)]
    pub height: Option<u32>,
    #[serde(rename = "Camera.fps", default)]
    pub fps: Option<f64>,
}

impl EngineSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to open settings {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse settings text. The OpenCV `%YAML:1.0` directive is not valid
    /// YAML and is dropped before parsing.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let body: String = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("%YAML"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_yaml::from_str(&body)?)
    }

    /// Expected image size, if the settings declare one.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    /// Nominal frame interval in seconds.
    pub fn frame_interval(&self) -> Option<f64> {
        self.fps.filter(|fps| *fps > 0.0).map(|fps| 1.0 / fps)
    }
}
