// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update mode: service transport requests until one launches an image, or
//! until the quick-boot window closes with no host.

use slotboot_common::boot_fsm::QuickBootWindow;
use slotboot_common::engine::BoardEngine;
use slotboot_common::image::ImageSource;
use slotboot_common::layout::{APP_START_ADDR, QSPI_BASE, SLOT_REGION_SIZE};
use slotboot_common::update::{handle_request, Transport, UpdateEvent, UpdateRequest};

use crate::boot::{self, Jump};
use crate::clock::Clock;
use crate::nvmctrl::Nvmctrl;

/// Memory-mapped slot storage.
///
/// This build does not configure the QSPI peripheral. Whatever brings up the
/// transport must also put the QSPI controller into memory-mapped (XIP) read
/// mode before it issues `CopyAndLaunch`; until then reads here return bus
/// garbage or fault.
pub struct MappedRegion {
    base: u32,
    size: u32,
}

impl MappedRegion {
    pub const fn qspi() -> Self {
        Self {
            base: QSPI_BASE,
            size: SLOT_REGION_SIZE,
        }
    }
}

impl ImageSource for MappedRegion {
    fn size(&self) -> u32 {
        self.size
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) {
        let src = (self.base + offset) as *const u8;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { src.add(i).read_volatile() };
        }
    }
}

/// No host link in this build. Update mode waits for a reset or for the
/// quick-boot window to close, so the engine is never driven on the device.
pub struct IdleTransport;

impl Transport for IdleTransport {
    fn poll(&mut self) -> Option<UpdateRequest<'_>> {
        None
    }
}

pub fn enter_update_mode<T: Transport>(
    engine: &mut BoardEngine<Nvmctrl>,
    transport: &mut T,
    clock: &Clock,
    mut window: QuickBootWindow,
) -> ! {
    defmt::println!("Entering update mode");

    let mut slots = MappedRegion::qspi();
    let mut handoff = Jump;

    loop {
        if window.expired(clock.now_ms()) {
            defmt::println!("No host, resetting into application");
            boot::reset_into_app();
        }

        let Some(request) = transport.poll() else {
            continue;
        };

        if window.is_armed() {
            window.cancel();
        }

        let event = handle_request(engine, &mut slots, &mut handoff, APP_START_ADDR, request);
        match event {
            UpdateEvent::HostAttached => defmt::println!("Host attached"),
            UpdateEvent::TransferStarted => defmt::println!("Transfer started"),
            UpdateEvent::Erased { blocks } => defmt::println!("Erased {} blocks", blocks),
            UpdateEvent::RowWritten(outcome) => defmt::trace!("Row: {}", outcome),
            // Already logged by the dispatcher
            UpdateEvent::Rejected(_) => {}
        }
    }
}
