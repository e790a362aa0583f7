// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Board layout and flash geometry for the SAMD51 target.
//!
//! Everything here is a plain constant so both the bootloader and the host
//! tools agree on where things live.

// --- Flash geometry ---

/// Total size of the internal flash, mapped at address 0.
pub const FLASH_SIZE: u32 = 512 * 1024;

/// Erase granule (NVMCTRL block).
pub const FLASH_BLOCK_SIZE: u32 = 8192;

/// Program granule handed to the engine.
pub const FLASH_ROW_SIZE: u32 = 512;

/// NVMCTRL page size, as reported by `PARAM.PSZ`.
pub const FLASH_PAGE_SIZE: u32 = 512;

/// Words committed by one Write-Quad-Word command.
pub const CHUNK_WORDS: usize = 4;

/// Bytes committed by one Write-Quad-Word command.
pub const CHUNK_SIZE: u32 = (CHUNK_WORDS * 4) as u32;

/// Value every word reads back as after an erase.
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Value every byte reads back as after an erase.
pub const ERASED_BYTE: u8 = 0xFF;

pub const FLASH_BLOCKS: usize = (FLASH_SIZE / FLASH_BLOCK_SIZE) as usize;
pub const ROWS_PER_BLOCK: usize = (FLASH_BLOCK_SIZE / FLASH_ROW_SIZE) as usize;
pub const ROW_WORDS: usize = (FLASH_ROW_SIZE / 4) as usize;

// --- Memory map ---

/// First byte after the bootloader; the application vector table lives here.
pub const APP_START_ADDR: u32 = 0x0000_4000;

/// Memory-mapped QSPI window holding the game slots.
pub const QSPI_BASE: u32 = 0x0400_0000;

/// Number of image slots stored in QSPI.
pub const MAX_SLOTS: usize = 4;

/// Size reserved for one slot in QSPI.
pub const SLOT_SIZE: u32 = FLASH_SIZE - APP_START_ADDR;

/// Readable extent of the slot region, starting at `QSPI_BASE`.
pub const SLOT_REGION_SIZE: u32 = MAX_SLOTS as u32 * SLOT_SIZE;

pub const RAM_BASE: u32 = 0x2000_0000;
pub const RAM_SIZE: u32 = 192 * 1024;

/// Boot sentinel word: the last word of SRAM, outside anything the runtime zeroes.
pub const SENTINEL_ADDR: u32 = RAM_BASE + RAM_SIZE - 4;

/// Top of the bootloader stack. The Cortex-M ABI wants it 8-byte aligned, so
/// the word below the sentinel is left unused.
pub const STACK_TOP: u32 = RAM_BASE + RAM_SIZE - 8;

// --- Sentinel values ---

pub const SENTINEL_NONE: u32 = 0;
pub const SENTINEL_FORCE: u32 = 0xF016_69EF;
pub const SENTINEL_QUICK_BOOT: u32 = 0xF026_69EF;

// --- Timing ---

/// How long a warm reset waits for a second tap before booting the application.
pub const DOUBLE_TAP_HOLD_MS: u32 = 500;

/// How long the bootloader waits for a host after a single reset before
/// resetting into the application.
pub const QUICK_BOOT_WINDOW_MS: u32 = 1500;

// Compile-time layout checks
const _: () = assert!(FLASH_BLOCK_SIZE % FLASH_ROW_SIZE == 0);
const _: () = assert!(FLASH_ROW_SIZE < FLASH_BLOCK_SIZE);
const _: () = assert!(FLASH_ROW_SIZE % CHUNK_SIZE == 0);
const _: () = assert!(FLASH_SIZE % FLASH_BLOCK_SIZE == 0);
const _: () = assert!(APP_START_ADDR % FLASH_BLOCK_SIZE == 0);
const _: () = assert!(APP_START_ADDR < FLASH_SIZE);
