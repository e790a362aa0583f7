// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory NVM controller for host tests and tools.
//!
//! Programming follows NOR semantics: a write can only clear bits, so writing
//! over a word that was not erased first leaves the AND of old and new data.
//! Protocol misuse (a command while busy, a quad-word write outside manual
//! mode or without a latched chunk) panics.

use crate::layout::{CHUNK_SIZE, CHUNK_WORDS, ERASED_BYTE};
use crate::nvm::{NvmCommand, NvmController};

/// One hardware operation, in issue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimOp {
    EraseBlock { block: usize },
    PageBufferClear,
    WriteQuadWord { addr: u32 },
}

pub struct SimNvm {
    mem: Vec<u8>,
    block_size: u32,
    addr: u32,
    latched: Option<(u32, [u32; CHUNK_WORDS])>,
    manual_write: bool,
    busy_polls: u32,
    busy_remaining: u32,
    polls: u64,
    erases: Vec<u32>,
    ops: Vec<SimOp>,
}

impl SimNvm {
    /// Fully erased flash of `size` bytes.
    pub fn new(size: u32, block_size: u32) -> Self {
        Self::from_image(vec![ERASED_BYTE; size as usize], block_size)
    }

    /// Flash preloaded with `image`; its length is the flash size.
    pub fn from_image(image: Vec<u8>, block_size: u32) -> Self {
        assert!(block_size > 0 && image.len() % block_size as usize == 0);
        let blocks = image.len() / block_size as usize;
        Self {
            mem: image,
            block_size,
            addr: 0,
            latched: None,
            manual_write: false,
            busy_polls: 0,
            busy_remaining: 0,
            polls: 0,
            erases: vec![0; blocks],
            ops: Vec::new(),
        }
    }

    /// Report busy for `polls` reads of the ready bit after every command.
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    pub fn memory(&self) -> &[u8] {
        &self.mem
    }

    pub fn into_image(self) -> Vec<u8> {
        self.mem
    }

    /// Times the block has been erased since construction.
    pub fn erase_count(&self, block: usize) -> u32 {
        self.erases[block]
    }

    pub fn total_erases(&self) -> u32 {
        self.erases.iter().sum()
    }

    pub fn ops(&self) -> &[SimOp] {
        &self.ops
    }

    /// Number of quad-word writes issued.
    pub fn chunk_writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SimOp::WriteQuadWord { .. }))
            .count()
    }

    /// Ready-bit samples taken so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    fn start_busy(&mut self) {
        self.busy_remaining = self.busy_polls;
    }

    fn erase(&mut self, addr: u32) {
        let block = (addr / self.block_size) as usize;
        let start = block * self.block_size as usize;
        let end = start + self.block_size as usize;
        self.mem[start..end].fill(ERASED_BYTE);
        self.erases[block] += 1;
        self.ops.push(SimOp::EraseBlock { block });
    }

    fn write_quad_word(&mut self, addr: u32) {
        assert!(self.manual_write, "quad-word write outside manual write mode");
        assert_eq!(addr % CHUNK_SIZE, 0, "quad-word write at unaligned 0x{:08x}", addr);
        let (latched_addr, words) = self.latched.take().expect("quad-word write without data");
        assert_eq!(latched_addr, addr, "page buffer latched for a different quad word");

        let start = addr as usize;
        for (i, word) in words.iter().enumerate() {
            for (j, byte) in word.to_le_bytes().iter().enumerate() {
                self.mem[start + i * 4 + j] &= byte;
            }
        }
        self.ops.push(SimOp::WriteQuadWord { addr });
    }
}

impl NvmController for SimNvm {
    fn is_ready(&mut self) -> bool {
        self.polls += 1;
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            false
        } else {
            true
        }
    }

    fn enable_manual_write(&mut self) {
        self.manual_write = true;
    }

    fn set_address(&mut self, addr: u32) {
        self.addr = addr;
    }

    fn issue(&mut self, cmd: NvmCommand) {
        assert_eq!(self.busy_remaining, 0, "{:?} issued while busy", cmd);
        match cmd {
            NvmCommand::EraseBlock => self.erase(self.addr),
            NvmCommand::WriteQuadWord => self.write_quad_word(self.addr),
            NvmCommand::PageBufferClear => {
                self.latched = None;
                self.ops.push(SimOp::PageBufferClear);
            }
        }
        self.start_busy();
    }

    fn load_chunk(&mut self, addr: u32, words: &[u32; CHUNK_WORDS]) {
        self.latched = Some((addr, *words));
    }

    fn read(&mut self, addr: u32, buf: &mut [u32]) {
        let start = addr as usize;
        for (i, word) in buf.iter_mut().enumerate() {
            let at = start + i * 4;
            *word = u32::from_le_bytes([
                self.mem[at],
                self.mem[at + 1],
                self.mem[at + 2],
                self.mem[at + 3],
            ]);
        }
    }
}
