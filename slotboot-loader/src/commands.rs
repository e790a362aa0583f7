// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use slotboot_common::boot_fsm::{decide, BootConfig, ResetCause, Sentinel};
use slotboot_common::image::checksum;
use slotboot_common::layout::{APP_START_ADDR, FLASH_BLOCK_SIZE, FLASH_SIZE};

use crate::slots::{FlashImage, SlotDir};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Show every slot with its size.
pub fn list(slots: &SlotDir) -> Result<()> {
    println!("Available slots:");
    for slot in slots.list() {
        match slot.size {
            Some(size) => println!(
                "  {}: {} ({} bytes, {})",
                slot.index,
                slot.label(),
                size,
                slot.path.display()
            ),
            None => println!("  {}: {}", slot.index, slot.label()),
        }
    }
    Ok(())
}

/// Copy a slot into the flash image through the flash engine, then verify it.
pub fn load(slots: &SlotDir, flash_path: &Path, index: usize) -> Result<()> {
    let image = slots.read(index)?;
    let size = image.len() as u32;
    let crc32 = CRC32.checksum(&image);

    println!("Slot {}: {} bytes, CRC32: 0x{:08x}", index, size, crc32);
    println!("Target:  {} at 0x{:08x}", flash_path.display(), APP_START_ADDR);
    println!();

    let (path, mut engine) = FlashImage::open(flash_path)?.into_engine();

    let pb = ProgressBar::new(size as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut source = image.as_slice();
    let report = engine
        .copy_image(APP_START_ADDR, &mut source, size, |done, _| {
            pb.set_position(done as u64)
        })
        .with_context(|| format!("Failed to copy slot {}", index));
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e);
        }
    };
    pb.finish_with_message("Copy complete");
    println!();

    let flash = FlashImage::from_engine(path, engine);
    let mut written = flash.app(image.len());
    let actual = checksum(&mut written, size);
    if actual != crc32 {
        bail!(
            "Verification failed: expected CRC32 0x{:08x}, flash has 0x{:08x}",
            crc32,
            actual
        );
    }
    flash.save()?;

    println!(
        "Rows: {} written, {} unchanged",
        report.rows - report.unchanged,
        report.unchanged
    );
    println!(
        "Blocks erased: {}, rows restored: {}",
        report.erased_blocks, report.restored_rows
    );
    println!("Verification successful!");
    println!(
        "Launch: vector table 0x{:08x}, reset vector 0x{:08x}",
        APP_START_ADDR,
        flash.word(APP_START_ADDR + 4)
    );

    Ok(())
}

/// Compare a slot with the application area by CRC-32.
pub fn verify(slots: &SlotDir, flash_path: &Path, index: usize) -> Result<()> {
    let image = slots.read(index)?;
    let flash = FlashImage::open(flash_path)?;

    let expected = CRC32.checksum(&image);
    let actual = CRC32.checksum(flash.app(image.len()));

    println!("Slot {}: CRC32 0x{:08x}", index, expected);
    println!("Flash:  CRC32 0x{:08x}", actual);

    if expected != actual {
        bail!("Verification failed: slot {} is not loaded", index);
    }
    println!("Verification successful!");
    Ok(())
}

/// Erase the flash image from `from` to the end.
pub fn erase(flash_path: &Path, from: u32) -> Result<()> {
    let (path, mut engine) = FlashImage::open(flash_path)?.into_engine();

    let blocks = engine
        .erase_to_end(from)
        .with_context(|| format!("Cannot erase from 0x{:08x}", from))?;
    FlashImage::from_engine(path, engine).save()?;

    println!(
        "Erased {} blocks (0x{:08x}..0x{:08x}, {} KB)",
        blocks,
        from,
        FLASH_SIZE,
        blocks as u32 * FLASH_BLOCK_SIZE / 1024
    );
    Ok(())
}

/// Show the application vector table and the boot decision for common resets.
pub fn status(flash_path: &Path, quick_boot: bool) -> Result<()> {
    let flash = FlashImage::open(flash_path)?;
    let config = BootConfig::board(quick_boot);

    let initial_sp = flash.word(APP_START_ADDR);
    let reset_vector = flash.word(APP_START_ADDR + 4);

    println!("Flash image: {}", flash_path.display());
    println!("  Initial SP:   0x{:08x}", initial_sp);
    println!(
        "  Reset vector: 0x{:08x} ({})",
        reset_vector,
        if config.reset_vector_valid(reset_vector) {
            "valid"
        } else {
            "no application"
        }
    );
    println!(
        "  Mode:         {}",
        if quick_boot { "quick boot" } else { "double tap" }
    );
    println!();

    let cases = [
        ("Power-on reset", ResetCause::PowerOn, Sentinel::None),
        ("Single reset", ResetCause::External, Sentinel::None),
        ("Double reset", ResetCause::External, Sentinel::ForceBootloader),
        ("Quick-boot expiry", ResetCause::System, Sentinel::QuickBootPending),
    ];
    println!("Boot decisions:");
    for (label, cause, sentinel) in cases {
        let decision = decide(&config, cause, sentinel, reset_vector);
        println!(
            "  {:<18} -> {:?} (sentinel {:?})",
            label,
            decision.outcome,
            decision.apply_to(sentinel)
        );
    }

    Ok(())
}
