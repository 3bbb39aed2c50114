// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::Command;

/// The binary, run in `cwd` with $HOME pointing there too, so that no stray config is picked up.
#[allow(dead_code)]
pub fn canidsel(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("canidsel").expect("binary");
    cmd.current_dir(cwd).env("HOME", cwd).env_remove("RUST_LOG");
    cmd
}

#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// In-frame CDS of `len` bp: ATG, GCC repeats, TAA.
#[allow(dead_code)]
pub fn clean_cds(len: usize) -> String {
    assert!(len % 3 == 0 && len >= 6);
    format!("ATG{}TAA", "GCC".repeat(len / 3 - 2))
}

#[allow(dead_code)]
pub fn write_alignment(dir: &Path, fname: &str, seqs: &[String]) {
    let mut text = String::new();
    for (i, seq) in seqs.iter().enumerate() {
        text.push_str(&format!(">sp{}\n{}\n", i + 1, seq));
    }
    fs::write(dir.join(fname), text).expect("write alignment");
}

#[allow(dead_code)]
pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().clone();
    String::from_utf8_lossy(&output.stdout).into_owned()
}
