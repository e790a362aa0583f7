// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Image copy: stream an image from a source region into flash row by row,
//! then hand control to it.

use core::convert::Infallible;

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::engine::{FlashEngine, RowOutcome};
use crate::error::FlashError;
use crate::layout::{ERASED_BYTE, ERASED_WORD};
use crate::nvm::NvmController;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Bytes pulled from the source per read.
const READ_CHUNK: usize = 64;

/// Random-access byte source for an image (QSPI window, file, buffer).
pub trait ImageSource {
    /// Number of readable bytes.
    fn size(&self) -> u32;

    /// Fill `buf` with the image bytes starting at `offset`.
    ///
    /// Callers keep `offset + buf.len()` within [`size`](Self::size).
    fn read(&mut self, offset: u32, buf: &mut [u8]);

    /// Whether `len` bytes starting at `offset` can be read.
    fn covers(&self, offset: u32, len: u32) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size())
    }
}

impl ImageSource for &[u8] {
    fn size(&self) -> u32 {
        u32::try_from(<[u8]>::len(self)).unwrap_or(u32::MAX)
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) {
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
    }
}

/// Transfer of control to a freshly written application.
pub trait Handoff {
    /// Jump to the application whose vector table starts at `vector_table`.
    fn launch(&mut self, vector_table: u32) -> !;
}

/// Totals for one image copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CopyReport {
    pub bytes: u32,
    pub rows: u32,
    pub unchanged: u32,
    pub erased_blocks: u32,
    pub restored_rows: u32,
}

impl CopyReport {
    fn record(&mut self, outcome: RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Unchanged => self.unchanged += 1,
            RowOutcome::Programmed => {}
            RowOutcome::ErasedAndProgrammed { restored } => {
                self.erased_blocks += 1;
                self.restored_rows += restored as u32;
            }
        }
    }
}

/// CRC-32 (ISO HDLC) of the first `length` bytes of `source`.
pub fn checksum<S: ImageSource + ?Sized>(source: &mut S, length: u32) -> u32 {
    let mut digest = CRC32.digest();
    let mut chunk = [0u8; READ_CHUNK];
    let mut offset = 0u32;

    while offset < length {
        let n = ((length - offset) as usize).min(chunk.len());
        source.read(offset, &mut chunk[..n]);
        digest.update(&chunk[..n]);
        offset += n as u32;
    }

    digest.finalize()
}

impl<C, const BLOCKS: usize, const ROWS: usize, const ROW_WORDS: usize>
    FlashEngine<C, BLOCKS, ROWS, ROW_WORDS>
where
    C: NvmController,
{
    /// Copy `length` bytes of `source` to flash starting at `dest`.
    ///
    /// Starts a fresh session. The whole destination range, and `length`
    /// against the size of `source`, are validated before anything is written. The last row may be short; its tail is filled with
    /// the erased pattern. `progress` sees the running byte count and the
    /// outcome of every row.
    pub fn copy_image<S, F>(
        &mut self,
        dest: u32,
        source: &mut S,
        length: u32,
        mut progress: F,
    ) -> Result<CopyReport, FlashError>
    where
        S: ImageSource + ?Sized,
        F: FnMut(u32, RowOutcome),
    {
        self.check_row(dest)?;
        let fits = dest
            .checked_add(length)
            .is_some_and(|end| end <= Self::FLASH_SIZE);
        if !fits {
            return Err(FlashError::OutOfRange { addr: dest, len: length });
        }
        if !source.covers(0, length) {
            return Err(FlashError::SourceOutOfRange {
                offset: 0,
                len: length,
            });
        }

        self.begin_session();

        let mut report = CopyReport::default();
        let mut offset = 0u32;
        while offset < length {
            let row_len = (length - offset).min(Self::ROW_SIZE);
            self.stage_row(source, offset, row_len);

            let outcome = self.program_row(dest + offset);
            report.record(outcome);

            offset += row_len;
            report.bytes = offset;
            progress(offset, outcome);
        }

        #[cfg(feature = "defmt")]
        defmt::println!(
            "Copied {} bytes: {} rows, {} unchanged, {} blocks erased",
            report.bytes,
            report.rows,
            report.unchanged,
            report.erased_blocks
        );

        Ok(report)
    }

    /// Copy an image to `app_base` and jump to it.
    ///
    /// Only returns if the destination or source range is invalid.
    pub fn copy_and_launch<S, H>(
        &mut self,
        app_base: u32,
        source: &mut S,
        length: u32,
        handoff: &mut H,
    ) -> Result<Infallible, FlashError>
    where
        S: ImageSource + ?Sized,
        H: Handoff + ?Sized,
    {
        self.copy_image(app_base, source, length, |_, _| {})?;
        handoff.launch(app_base)
    }

    /// Load `len` bytes at `offset` into the row buffer, padding with erased bytes.
    fn stage_row<S: ImageSource + ?Sized>(&mut self, source: &mut S, offset: u32, len: u32) {
        self.row = [ERASED_WORD; ROW_WORDS];

        let mut chunk = [ERASED_BYTE; READ_CHUNK];
        let mut done = 0usize;
        let len = len as usize;
        while done < len {
            let n = (len - done).min(READ_CHUNK);
            chunk.fill(ERASED_BYTE);
            source.read(offset + done as u32, &mut chunk[..n]);

            let words = &mut self.row[done / 4..];
            for (word, bytes) in words.iter_mut().zip(chunk[..n.div_ceil(4) * 4].chunks_exact(4)) {
                *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            done += n;
        }
    }
}
