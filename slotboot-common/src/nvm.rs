// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! NVM controller adapter: the erase/program primitives the flash engine is
//! built on.
//!
//! The adapter talks to the controller through [`NvmController`], a narrow
//! register-level trait. The bootloader implements it over the SAMD51 NVMCTRL
//! registers; [`crate::sim::SimNvm`] implements it in memory for host tests and
//! tools.
//!
//! All waits are busy-polls on the controller's ready bit with no timeout. A
//! controller that never becomes ready hangs the caller; recovery is a
//! watchdog reset.

use crate::layout::{CHUNK_SIZE, CHUNK_WORDS, ERASED_WORD, FLASH_PAGE_SIZE, FLASH_SIZE};

// --- NVMCTRL register fields (SAMD51) ---

/// `CTRLB.CMDEX` key that must accompany every command.
pub const CMDEX_KEY: u16 = 0xA5;

/// `CTRLA.WMODE`, bits 5:4. Zero selects manual page write.
pub const CTRLA_WMODE_MASK: u16 = 0b11 << 4;
pub const CTRLA_CACHEDIS0: u16 = 1 << 14;
pub const CTRLA_CACHEDIS1: u16 = 1 << 15;

/// `STATUS.READY`.
pub const STATUS_READY: u16 = 1 << 0;

/// Commands issued through `CTRLB.CMD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NvmCommand {
    /// Erase the block containing `ADDR`.
    EraseBlock = 0x01,
    /// Program the quad word at `ADDR` from the page buffer.
    WriteQuadWord = 0x04,
    /// Reset the page buffer to the erased pattern.
    PageBufferClear = 0x15,
}

impl NvmCommand {
    /// Full `CTRLB` value for this command, key included.
    pub const fn ctrlb(self) -> u16 {
        (CMDEX_KEY << 8) | self as u16
    }
}

/// `CTRLA` value that selects manual page write and disables both NVM caches,
/// keeping every other bit of `ctrla`.
pub const fn ctrla_for_programming(ctrla: u16) -> u16 {
    (ctrla & !CTRLA_WMODE_MASK) | CTRLA_CACHEDIS0 | CTRLA_CACHEDIS1
}

/// Decoded `PARAM` register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NvmParam {
    pub pages: u32,
    pub page_size: u32,
}

impl NvmParam {
    pub const fn decode(raw: u32) -> Self {
        Self {
            pages: raw & 0xFFFF,
            page_size: 8 << ((raw >> 16) & 0x7),
        }
    }

    pub const fn flash_size(&self) -> u32 {
        self.page_size * self.pages
    }

    /// True when the silicon agrees with the compiled-in layout.
    pub const fn matches_layout(&self) -> bool {
        self.page_size == FLASH_PAGE_SIZE && self.flash_size() == FLASH_SIZE
    }
}

/// Register-level access to an NVM controller.
pub trait NvmController {
    /// Sample the ready bit.
    fn is_ready(&mut self) -> bool;

    /// Select manual page write mode and disable the NVM caches.
    fn enable_manual_write(&mut self);

    /// Load the address register.
    fn set_address(&mut self, addr: u32);

    /// Write `CTRLB` with `cmd`.
    fn issue(&mut self, cmd: NvmCommand);

    /// Latch one chunk into the page buffer for the quad word at `addr`.
    fn load_chunk(&mut self, addr: u32, words: &[u32; CHUNK_WORDS]);

    /// Read words of flash starting at `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u32]);
}

/// Blocking erase/program operations on top of an [`NvmController`].
pub struct FlashAdapter<C> {
    nvm: C,
}

impl<C: NvmController> FlashAdapter<C> {
    pub const fn new(nvm: C) -> Self {
        Self { nvm }
    }

    pub fn controller(&self) -> &C {
        &self.nvm
    }

    pub fn into_inner(self) -> C {
        self.nvm
    }

    /// Spin until the controller reports ready.
    pub fn wait_ready(&mut self) {
        while !self.nvm.is_ready() {
            core::hint::spin_loop();
        }
    }

    /// Erase the block containing `addr`. Returns once the erase has finished.
    pub fn erase_block(&mut self, addr: u32) {
        self.wait_ready();
        self.nvm.set_address(addr);
        self.nvm.issue(NvmCommand::EraseBlock);
        self.wait_ready();
    }

    /// Switch to manual write mode and reset the page buffer.
    pub fn clear_write_buffer(&mut self) {
        self.nvm.enable_manual_write();
        self.wait_ready();
        self.nvm.issue(NvmCommand::PageBufferClear);
        self.wait_ready();
    }

    /// Program one quad word at `addr`. Does not wait for completion.
    pub fn commit_chunk(&mut self, addr: u32, words: &[u32; CHUNK_WORDS]) {
        self.wait_ready();
        self.nvm.load_chunk(addr, words);
        self.nvm.set_address(addr);
        self.nvm.issue(NvmCommand::WriteQuadWord);
    }

    /// Program `words` starting at `addr`, one chunk at a time.
    ///
    /// A short final chunk is padded with the erased pattern so the untouched
    /// words read back as erased.
    pub fn write_words(&mut self, addr: u32, words: &[u32]) {
        self.clear_write_buffer();

        let mut chunk_addr = addr;
        for piece in words.chunks(CHUNK_WORDS) {
            let mut chunk = [ERASED_WORD; CHUNK_WORDS];
            chunk[..piece.len()].copy_from_slice(piece);
            self.commit_chunk(chunk_addr, &chunk);
            chunk_addr += CHUNK_SIZE;
        }
    }

    pub fn read(&mut self, addr: u32, buf: &mut [u32]) {
        self.nvm.read(addr, buf);
    }
}
