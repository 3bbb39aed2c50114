// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CanidError;
use crate::qc::codon_check::FramePolicy;

pub const CONFIG_FILE_NAME: &str = ".canidselconfig";

/// Parameters of `canidsel filter`. Values from the config file are overridden by command-line
/// flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub max_gap_fraction: f64,
    pub min_species: usize,
    pub trim_edges: bool,
    pub min_alignment_length: usize,
    pub frame_policy: FramePolicy,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            max_gap_fraction: 0.5,
            min_species: 4,
            trim_edges: false,
            min_alignment_length: 150,
            frame_policy: FramePolicy::Lenient,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanidConfig {
    pub filter: FilterSettings,
}

impl CanidConfig {
    pub fn from_file(path: &Path) -> Result<Self, CanidError> {
        let text = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        CanidConfig::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, CanidError> {
        let config: CanidConfig = serde_json::from_value(value.clone())?;
        let gap = config.filter.max_gap_fraction;
        if !(0.0..=1.0).contains(&gap) {
            return Err(CanidError::Format(format!(
                "max_gap_fraction must be within [0, 1], got {}",
                gap
            )));
        }
        if config.filter.min_species == 0 {
            return Err(CanidError::Format(String::from(
                "min_species must be at least 1",
            )));
        }
        Ok(config)
    }
}

/// Looks for a config file in $HOME, then in the current directory.
pub fn find_config() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let path = PathBuf::from(home).join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }
    None
}
