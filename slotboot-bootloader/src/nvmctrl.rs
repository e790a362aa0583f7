// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SAMD51 NVMCTRL register access.

use slotboot_common::layout::CHUNK_WORDS;
use slotboot_common::nvm::{
    ctrla_for_programming, NvmCommand, NvmController, NvmParam, CTRLA_CACHEDIS0,
    CTRLA_CACHEDIS1, STATUS_READY,
};

const NVMCTRL_BASE: u32 = 0x4100_4000;

const CTRLA: *mut u16 = NVMCTRL_BASE as *mut u16;
const CTRLB: *mut u16 = (NVMCTRL_BASE + 0x04) as *mut u16;
const PARAM: *const u32 = (NVMCTRL_BASE + 0x08) as *const u32;
const STATUS: *const u16 = (NVMCTRL_BASE + 0x12) as *const u16;
const ADDR: *mut u32 = (NVMCTRL_BASE + 0x14) as *mut u32;

/// Owner of the NVMCTRL peripheral.
pub struct Nvmctrl {
    _private: (),
}

impl Nvmctrl {
    /// # Safety
    /// Only one `Nvmctrl` may exist, and nothing else may drive NVMCTRL.
    pub unsafe fn steal() -> Self {
        Self { _private: () }
    }

    pub fn param(&self) -> NvmParam {
        NvmParam::decode(unsafe { PARAM.read_volatile() })
    }

    /// Set CACHEDIS0/1. Rev A silicon can serve stale lines after a write.
    pub fn disable_caches(&mut self) {
        unsafe {
            let ctrla = CTRLA.read_volatile();
            CTRLA.write_volatile(ctrla | CTRLA_CACHEDIS0 | CTRLA_CACHEDIS1);
        }
    }
}

impl NvmController for Nvmctrl {
    fn is_ready(&mut self) -> bool {
        unsafe { STATUS.read_volatile() & STATUS_READY != 0 }
    }

    fn enable_manual_write(&mut self) {
        unsafe {
            let ctrla = CTRLA.read_volatile();
            CTRLA.write_volatile(ctrla_for_programming(ctrla));
        }
    }

    fn set_address(&mut self, addr: u32) {
        unsafe { ADDR.write_volatile(addr) }
    }

    fn issue(&mut self, cmd: NvmCommand) {
        unsafe { CTRLB.write_volatile(cmd.ctrlb()) }
    }

    fn load_chunk(&mut self, addr: u32, words: &[u32; CHUNK_WORDS]) {
        // Stores into the flash address space land in the page buffer
        let dst = addr as *mut u32;
        for (i, word) in words.iter().enumerate() {
            unsafe { dst.add(i).write_volatile(*word) }
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u32]) {
        let src = addr as *const u32;
        for (i, word) in buf.iter_mut().enumerate() {
            *word = unsafe { src.add(i).read_volatile() };
        }
    }
}
