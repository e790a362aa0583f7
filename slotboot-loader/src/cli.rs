// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slotboot_common::layout::APP_START_ADDR;

use crate::commands;
use crate::slots::SlotDir;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "slotboot-loader")]
#[command(about = "Load QSPI game slots into a slotboot flash image")]
pub struct Cli {
    /// Directory holding slot0.bin .. slot3.bin
    #[arg(short, long, default_value = "qspi_slots")]
    pub slots: PathBuf,

    /// Internal flash image (created erased if missing)
    #[arg(short, long, default_value = "internal_flash.bin")]
    pub flash: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List the slots and their sizes
    List,

    /// Copy a slot into the application area of the flash image
    Load {
        #[arg(value_name = "SLOT")]
        slot: usize,
    },

    /// Compare a slot with the application area by CRC-32
    Verify {
        #[arg(value_name = "SLOT")]
        slot: usize,
    },

    /// Erase the flash image from an address to the end
    Erase {
        /// Block-aligned start address (hex with 0x, or decimal)
        #[arg(long, value_parser = parse_addr, default_value_t = APP_START_ADDR)]
        from: u32,
    },

    /// Show what the bootloader would do with the flash image
    Status {
        /// Evaluate as a single-reset (quick-boot) board
        #[arg(long)]
        quick_boot: bool,
    },
}

fn parse_addr(s: &str) -> Result<u32> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("Invalid address: {}", s))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let slots = SlotDir::new(&cli.slots);

    match cli.command {
        Commands::List => commands::list(&slots),
        Commands::Load { slot } => commands::load(&slots, &cli.flash, slot),
        Commands::Verify { slot } => commands::verify(&slots, &cli.flash, slot),
        Commands::Erase { from } => commands::erase(&cli.flash, from),
        Commands::Status { quick_boot } => commands::status(&cli.flash, quick_boot),
    }
}
