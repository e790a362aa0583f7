// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! slotboot: SAMD51 bootloader with double-tap update mode and QSPI game slots.

#![no_std]
#![no_main]

mod boot;
mod clock;
mod nvmctrl;
mod update;

use cortex_m_rt::entry;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use panic_probe as _;
use slotboot_common::boot_fsm::{self, BootConfig, BootDecision, BootOutcome, QuickBootWindow};
use slotboot_common::engine::BoardEngine;
use slotboot_common::layout::{APP_START_ADDR, DOUBLE_TAP_HOLD_MS, QUICK_BOOT_WINDOW_MS};

defmt::timestamp!("{=u64:us}", { 0 });

const BOOT_CONFIG: BootConfig = BootConfig::board(cfg!(feature = "quick-boot"));

#[entry]
fn main() -> ! {
    // Started by another bootloader or a debugger with a relocated table
    if boot::vtor() != 0 {
        loop {
            cortex_m::asm::nop();
        }
    }

    defmt::println!("Bootloader init");

    let Some(core) = cortex_m::Peripherals::take() else {
        defmt::panic!("core peripherals already taken");
    };
    let mut clock = clock::Clock::new(core.SYST);

    let mut nvm = unsafe { nvmctrl::Nvmctrl::steal() };
    let param = nvm.param();
    let layout_ok = param.matches_layout();
    if !layout_ok {
        defmt::warn!(
            "NVM reports {} pages of {} bytes, layout mismatch",
            param.pages,
            param.page_size
        );
    }
    nvm.disable_caches();

    let cause = boot::reset_cause();
    let sentinel = boot::read_sentinel();
    let app = unsafe { boot::VectorTable::read_from(APP_START_ADDR) };
    defmt::println!(
        "Reset cause {}, sentinel {}, app reset vector 0x{:08x}",
        cause,
        sentinel,
        app.reset_vector
    );

    let mut window = QuickBootWindow::new();
    let decision = if layout_ok {
        boot_fsm::decide(&BOOT_CONFIG, cause, sentinel, app.reset_vector)
    } else {
        BootDecision {
            outcome: BootOutcome::RemainUpdateMode,
            sentinel: None,
        }
    };
    apply(&decision);

    match decision.outcome {
        BootOutcome::JumpToApplication => launch(),
        BootOutcome::HoldForDoubleTap => {
            // A reset during this hold sees FORCE and stays in update mode
            clock.delay_ms(DOUBLE_TAP_HOLD_MS);
            apply(&boot_fsm::finish_double_tap_hold());
            launch();
        }
        BootOutcome::ArmQuickBootWindow => window.arm(clock.now_ms(), QUICK_BOOT_WINDOW_MS),
        BootOutcome::RemainUpdateMode => {}
    }

    if !layout_ok {
        // Never program flash whose geometry we do not know
        loop {
            cortex_m::asm::wfi();
        }
    }

    let mut engine = BoardEngine::new(nvm, APP_START_ADDR);
    update::enter_update_mode(&mut engine, &mut update::IdleTransport, &clock, window);
}

fn apply(decision: &BootDecision) {
    if let Some(sentinel) = decision.sentinel {
        boot::write_sentinel(sentinel);
    }
}

fn launch() -> ! {
    defmt::println!("Jumping to application");
    unsafe { boot::jump_to_app(APP_START_ADDR) }
}
