// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash programming engine: row writes on top of block erases.
//!
//! Rows are the write granule, blocks the (coarser) erase granule. A block is
//! erased at most once per session, the first time a row in it actually
//! differs from what is on flash. Rows that were skipped earlier because they
//! already matched are cached before that erase and written back after it.
//!
//! The geometry is carried in const parameters:
//! - `BLOCKS`: number of blocks in the flash
//! - `ROWS`: rows per block
//! - `ROW_WORDS`: 32-bit words per row

use crate::error::FlashError;
use crate::layout::{self, ERASED_WORD};
use crate::nvm::{FlashAdapter, NvmController};

/// Words compared per flash read on the fast path.
const COMPARE_WORDS: usize = 16;

/// Engine for the board's internal flash.
pub type BoardEngine<C> = FlashEngine<
    C,
    { layout::FLASH_BLOCKS },
    { layout::ROWS_PER_BLOCK },
    { layout::ROW_WORDS },
>;

/// What `write_row` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RowOutcome {
    /// Flash already held the data; nothing was touched.
    Unchanged,
    /// The block was already erased this session; the row was programmed.
    Programmed,
    /// The block was erased first and `restored` cached rows were written back.
    ErasedAndProgrammed { restored: usize },
}

/// Per-session bookkeeping, one entry per block and per row.
pub struct Session<const BLOCKS: usize, const ROWS: usize> {
    erased: [bool; BLOCKS],
    unchanged: [[bool; ROWS]; BLOCKS],
}

impl<const BLOCKS: usize, const ROWS: usize> Session<BLOCKS, ROWS> {
    pub const fn new() -> Self {
        Self {
            erased: [false; BLOCKS],
            unchanged: [[false; ROWS]; BLOCKS],
        }
    }

    fn reset(&mut self) {
        self.erased = [false; BLOCKS];
        self.unchanged = [[false; ROWS]; BLOCKS];
    }

    pub fn is_erased(&self, block: usize) -> bool {
        self.erased[block]
    }

    pub fn is_unchanged(&self, block: usize, row: usize) -> bool {
        self.unchanged[block][row]
    }

    /// Rows of `block` still waiting to be preserved across an erase.
    pub fn pending_rows(&self, block: usize) -> usize {
        self.unchanged[block].iter().filter(|&&same| same).count()
    }
}

impl<const BLOCKS: usize, const ROWS: usize> Default for Session<BLOCKS, ROWS> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FlashEngine<C, const BLOCKS: usize, const ROWS: usize, const ROW_WORDS: usize> {
    flash: FlashAdapter<C>,
    session: Session<BLOCKS, ROWS>,
    /// First address the engine may modify.
    floor: u32,
    /// Holding buffer for one block's unchanged rows.
    cache: [[u32; ROW_WORDS]; ROWS],
    /// Row being written, in flash word order.
    pub(crate) row: [u32; ROW_WORDS],
}

impl<C, const BLOCKS: usize, const ROWS: usize, const ROW_WORDS: usize>
    FlashEngine<C, BLOCKS, ROWS, ROW_WORDS>
where
    C: NvmController,
{
    pub const ROW_SIZE: u32 = (ROW_WORDS * 4) as u32;
    pub const BLOCK_SIZE: u32 = Self::ROW_SIZE * ROWS as u32;
    pub const FLASH_SIZE: u32 = Self::BLOCK_SIZE * BLOCKS as u32;

    const GEOMETRY_OK: () = {
        assert!(BLOCKS > 0, "flash must have at least one block");
        assert!(ROWS > 1, "a row must be smaller than a block");
        assert!(ROW_WORDS > 0, "rows must hold at least one word");
    };

    /// Create an engine that never modifies flash below `floor`.
    pub fn new(nvm: C, floor: u32) -> Self {
        let () = Self::GEOMETRY_OK;
        Self {
            flash: FlashAdapter::new(nvm),
            session: Session::new(),
            floor,
            cache: [[ERASED_WORD; ROW_WORDS]; ROWS],
            row: [ERASED_WORD; ROW_WORDS],
        }
    }

    pub fn session(&self) -> &Session<BLOCKS, ROWS> {
        &self.session
    }

    pub fn controller(&self) -> &C {
        self.flash.controller()
    }

    pub fn into_inner(self) -> C {
        self.flash.into_inner()
    }

    /// Forget all erase and skip bookkeeping.
    ///
    /// Call between logically distinct transfers; flash contents are not
    /// touched.
    pub fn begin_session(&mut self) {
        self.session.reset();
    }

    /// Write one row.
    ///
    /// `addr` must be row aligned and `data` exactly one row long.
    pub fn write_row(&mut self, addr: u32, data: &[u8]) -> Result<RowOutcome, FlashError> {
        if data.len() != Self::ROW_SIZE as usize {
            return Err(FlashError::BadLength {
                expected: Self::ROW_SIZE,
                actual: data.len() as u32,
            });
        }
        self.check_row(addr)?;

        for (word, bytes) in self.row.iter_mut().zip(data.chunks_exact(4)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Ok(self.program_row(addr))
    }

    /// Erase every block from `addr` to the end of flash.
    ///
    /// `addr` must be block aligned. Returns the number of blocks erased.
    pub fn erase_to_end(&mut self, addr: u32) -> Result<usize, FlashError> {
        if addr % Self::BLOCK_SIZE != 0 {
            return Err(FlashError::Misaligned { addr });
        }
        if addr < self.floor || addr >= Self::FLASH_SIZE {
            return Err(FlashError::OutOfRange { addr, len: 0 });
        }

        let first = (addr / Self::BLOCK_SIZE) as usize;
        for block in first..BLOCKS {
            self.flash.erase_block(block as u32 * Self::BLOCK_SIZE);
            self.session.erased[block] = true;
            self.session.unchanged[block] = [false; ROWS];
        }

        #[cfg(feature = "defmt")]
        defmt::println!("Erased {} blocks from 0x{:08x}", BLOCKS - first, addr);

        Ok(BLOCKS - first)
    }

    pub(crate) fn check_row(&self, addr: u32) -> Result<(), FlashError> {
        if addr % Self::ROW_SIZE != 0 {
            return Err(FlashError::Misaligned { addr });
        }
        let in_range = addr
            .checked_add(Self::ROW_SIZE)
            .is_some_and(|end| end <= Self::FLASH_SIZE);
        if addr < self.floor || !in_range {
            return Err(FlashError::OutOfRange {
                addr,
                len: Self::ROW_SIZE,
            });
        }
        Ok(())
    }

    /// Program `self.row` at a validated row address.
    pub(crate) fn program_row(&mut self, addr: u32) -> RowOutcome {
        let block = (addr / Self::BLOCK_SIZE) as usize;
        let row = ((addr % Self::BLOCK_SIZE) / Self::ROW_SIZE) as usize;

        if self.row_matches(addr) {
            self.session.unchanged[block][row] = true;
            return RowOutcome::Unchanged;
        }

        let outcome = if self.session.erased[block] {
            RowOutcome::Programmed
        } else {
            let restored = self.erase_preserving(block, row);
            RowOutcome::ErasedAndProgrammed { restored }
        };

        self.session.unchanged[block][row] = false;
        self.flash.write_words(addr, &self.row);
        self.flash.wait_ready();
        outcome
    }

    fn row_matches(&mut self, addr: u32) -> bool {
        let mut current = [0u32; COMPARE_WORDS];
        let mut at = addr;
        for expected in self.row.chunks(COMPARE_WORDS) {
            let current = &mut current[..expected.len()];
            self.flash.read(at, current);
            if current != expected {
                return false;
            }
            at += (expected.len() * 4) as u32;
        }
        true
    }

    /// Erase `block`, keeping every row already confirmed unchanged.
    ///
    /// `skip` is the row about to be rewritten; its old content is not kept.
    fn erase_preserving(&mut self, block: usize, skip: usize) -> usize {
        let base = block as u32 * Self::BLOCK_SIZE;
        let mut kept = self.session.unchanged[block];
        kept[skip] = false;

        for (r, cached) in self.cache.iter_mut().enumerate() {
            if kept[r] {
                self.flash.read(base + r as u32 * Self::ROW_SIZE, cached);
            }
        }

        self.flash.erase_block(base);
        self.session.erased[block] = true;

        let mut restored = 0;
        for (r, cached) in self.cache.iter().enumerate() {
            if kept[r] {
                self.flash.write_words(base + r as u32 * Self::ROW_SIZE, cached);
                restored += 1;
            }
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Erased block {}, restored {} rows", block, restored);

        restored
    }
}
