// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

pub mod absrel_log;
pub mod json;

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::CanidError;

/// P-values below this count as significant throughout.
pub const SIGNIFICANCE: f64 = 0.05;

/// Files in `dir` with the given extension (without the dot), sorted by file name.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, CanidError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
