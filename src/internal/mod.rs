// SPDX-License-Identifier: MPL-2.0

//! Non exposed modules.

pub mod arena;
pub mod assignment;
pub mod core;
pub mod incompatibility;
pub mod memory;
pub mod partial_solution;
pub mod small_map;
