// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot inputs (reset cause, sentinel, application vector table) and the
//! jump into the application.

use slotboot_common::boot_fsm::{ResetCause, Sentinel};
use slotboot_common::image::Handoff;
use slotboot_common::layout::SENTINEL_ADDR;

const RSTC_RCAUSE: *const u8 = 0x4000_0C00 as *const u8;
const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
const SENTINEL: *mut u32 = SENTINEL_ADDR as *mut u32;

pub struct VectorTable {
    pub initial_sp: u32,
    pub reset_vector: u32,
}

impl VectorTable {
    /// # Safety
    /// `addr` must be a readable, word-aligned address.
    pub unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }
}

pub fn reset_cause() -> ResetCause {
    ResetCause::from_rcause(unsafe { RSTC_RCAUSE.read_volatile() })
}

pub fn read_sentinel() -> Sentinel {
    Sentinel::from_raw(unsafe { SENTINEL.read_volatile() })
}

pub fn write_sentinel(sentinel: Sentinel) {
    unsafe { SENTINEL.write_volatile(sentinel.raw()) }
}

/// Current vector table offset. Non-zero means we were not started from reset.
pub fn vtor() -> u32 {
    unsafe { SCB_VTOR.read_volatile() }
}

/// Store `QuickBootPending` and reset; the next boot goes straight to the
/// application.
pub fn reset_into_app() -> ! {
    write_sentinel(slotboot_common::boot_fsm::reset_into_app());
    cortex_m::peripheral::SCB::sys_reset()
}

/// Handoff that jumps to the application in place.
pub struct Jump;

impl Handoff for Jump {
    fn launch(&mut self, vector_table: u32) -> ! {
        defmt::println!("Jumping to application at 0x{:08x}", vector_table);
        unsafe { jump_to_app(vector_table) }
    }
}

/// # Safety
/// `vector_table` must hold a valid application vector table.
pub unsafe fn jump_to_app(vector_table: u32) -> ! {
    prepare_for_handoff();
    relocate_vector_table(vector_table);

    let vt = VectorTable::read_from(vector_table);
    jump_to_firmware(vt.initial_sp, vt.reset_vector);
}

/// Leave the core as the application's startup code expects it: no SysTick,
/// nothing enabled or pending in the NVIC.
unsafe fn prepare_for_handoff() {
    cortex_m::interrupt::disable();

    const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
    SYST_CSR.write_volatile(0);

    // SAMD51 has 137 interrupt lines: five ICER/ICPR words
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    for i in 0..5 {
        NVIC_ICER.add(i).write_volatile(0xFFFF_FFFF);
        NVIC_ICPR.add(i).write_volatile(0xFFFF_FFFF);
    }
}

unsafe fn relocate_vector_table(addr: u32) {
    SCB_VTOR.write_volatile(addr);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
