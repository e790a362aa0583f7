// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side slot loader for slotboot.
//!
//! Works on a directory of slot images (`slot0.bin` .. `slot3.bin`) and a file
//! holding the whole internal flash, using the same flash engine as the
//! bootloader.
//!
//! Usage:
//!   slotboot-loader list
//!   slotboot-loader load 2
//!   slotboot-loader --flash board.bin verify 2
//!   slotboot-loader erase --from 0x8000
//!   slotboot-loader status --quick-boot

mod cli;
mod commands;
mod slots;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
