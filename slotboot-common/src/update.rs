// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update-mode request dispatch.
//!
//! The transport (USB mass storage, serial monitor, ...) is not part of this
//! crate. It hands over decoded requests through [`Transport`], and
//! [`handle_request`] turns each one into flash engine calls:
//! - `HostAttached`: a host has enumerated; stop the quick-boot window
//! - `BeginTransfer`: a new image starts; reset engine bookkeeping
//! - `WriteRow`: program one row at an absolute flash address
//! - `EraseToEnd`: wipe flash from a block address upward
//! - `CopyAndLaunch`: copy an image from the slot region and boot it

use crate::engine::{FlashEngine, RowOutcome};
use crate::error::FlashError;
use crate::image::{Handoff, ImageSource};
use crate::nvm::NvmController;

/// A request from the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateRequest<'a> {
    HostAttached,
    BeginTransfer,
    WriteRow { addr: u32, data: &'a [u8] },
    EraseToEnd { addr: u32 },
    /// Copy `length` bytes from `offset` in the slot region to the application base.
    CopyAndLaunch { offset: u32, length: u32 },
}

/// Result of handling one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateEvent {
    HostAttached,
    TransferStarted,
    RowWritten(RowOutcome),
    Erased { blocks: usize },
    Rejected(FlashError),
}

/// Source of update requests.
pub trait Transport {
    /// Return the next complete request, if any. Must not block.
    fn poll(&mut self) -> Option<UpdateRequest<'_>>;
}

/// Slot region offset by `base`, so images can be addressed inside it.
struct Offset<'s, S: ?Sized> {
    source: &'s mut S,
    base: u32,
}

impl<S: ImageSource + ?Sized> ImageSource for Offset<'_, S> {
    fn size(&self) -> u32 {
        self.source.size().saturating_sub(self.base)
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) {
        self.source.read(self.base + offset, buf);
    }
}

/// Dispatch a request to the engine.
///
/// `CopyAndLaunch` only returns if the request is rejected.
pub fn handle_request<C, S, H, const BLOCKS: usize, const ROWS: usize, const ROW_WORDS: usize>(
    engine: &mut FlashEngine<C, BLOCKS, ROWS, ROW_WORDS>,
    slots: &mut S,
    handoff: &mut H,
    app_base: u32,
    request: UpdateRequest<'_>,
) -> UpdateEvent
where
    C: NvmController,
    S: ImageSource + ?Sized,
    H: Handoff + ?Sized,
{
    match request {
        UpdateRequest::HostAttached => UpdateEvent::HostAttached,
        UpdateRequest::BeginTransfer => {
            engine.begin_session();
            UpdateEvent::TransferStarted
        }
        UpdateRequest::WriteRow { addr, data } => match engine.write_row(addr, data) {
            Ok(outcome) => UpdateEvent::RowWritten(outcome),
            Err(err) => reject(err),
        },
        UpdateRequest::EraseToEnd { addr } => match engine.erase_to_end(addr) {
            Ok(blocks) => UpdateEvent::Erased { blocks },
            Err(err) => reject(err),
        },
        UpdateRequest::CopyAndLaunch { offset, length } => {
            // Nothing may be erased before the whole image is known to be readable
            if !slots.covers(offset, length) {
                return reject(FlashError::SourceOutOfRange { offset, len: length });
            }
            let mut image = Offset {
                source: slots,
                base: offset,
            };
            match engine.copy_and_launch(app_base, &mut image, length, handoff) {
                Ok(never) => match never {},
                Err(err) => reject(err),
            }
        }
    }
}

fn reject(err: FlashError) -> UpdateEvent {
    #[cfg(feature = "defmt")]
    defmt::warn!("Request rejected: {}", err);

    UpdateEvent::Rejected(err)
}
