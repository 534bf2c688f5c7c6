// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh export

mod export_msh;

pub use export_msh::{export as export_msh, write_msh};
