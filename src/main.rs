// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use canidsel::errors::CanidError;

fn main() -> Result<(), CanidError> {
    canidsel::run()
}
