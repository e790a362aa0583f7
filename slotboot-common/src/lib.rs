// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash programming and boot decision logic for the slotboot bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: enables the simulated NVM controller for host tools and tests
//! - `defmt` feature: derives `defmt::Format` and logs engine activity

#![cfg_attr(not(feature = "std"), no_std)]

pub mod boot_fsm;
pub mod engine;
pub mod error;
pub mod image;
pub mod layout;
pub mod nvm;
pub mod update;

#[cfg(feature = "std")]
pub mod sim;

// Re-export commonly used types
pub use boot_fsm::{BootConfig, BootDecision, BootOutcome, QuickBootWindow, ResetCause, Sentinel};
pub use engine::{BoardEngine, FlashEngine, RowOutcome};
pub use error::FlashError;
pub use image::{CopyReport, Handoff, ImageSource};
pub use layout::{APP_START_ADDR, FLASH_BLOCK_SIZE, FLASH_ROW_SIZE, FLASH_SIZE, SENTINEL_ADDR};
pub use nvm::{FlashAdapter, NvmCommand, NvmController};
pub use update::{handle_request, Transport, UpdateEvent, UpdateRequest};
