// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Millisecond clock on SysTick.

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use cortex_m_rt::exception;
use embedded_hal::delay::DelayNs;

/// GCLK0 out of reset: DFLL48M.
const CORE_HZ: u32 = 48_000_000;

static MILLIS: AtomicU32 = AtomicU32::new(0);

#[exception]
fn SysTick() {
    MILLIS.fetch_add(1, Ordering::Relaxed);
}

pub struct Clock {
    _syst: SYST,
}

impl Clock {
    pub fn new(mut syst: SYST) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(CORE_HZ / 1_000 - 1);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();
        Self { _syst: syst }
    }

    /// Milliseconds since the clock started; wraps after ~49 days.
    pub fn now_ms(&self) -> u32 {
        MILLIS.load(Ordering::Relaxed)
    }
}

impl DelayNs for Clock {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (ns as u64 * CORE_HZ as u64).div_ceil(1_000_000_000);
        cortex_m::asm::delay(cycles as u32);
    }

    fn delay_ms(&mut self, ms: u32) {
        let start = self.now_ms();
        while self.now_ms().wrapping_sub(start) < ms {
            cortex_m::asm::wfi();
        }
    }
}
