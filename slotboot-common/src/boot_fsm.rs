// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot decision FSM - pure logic without hardware dependencies.
//!
//! Runs once per reset and decides between launching the application and
//! staying in update mode. The inputs (reset cause, sentinel, reset vector)
//! are read by the caller; the decision says what to do next and what, if
//! anything, to write back to the sentinel word.
//!
//! Double tap: a warm reset arms the sentinel with `ForceBootloader` and
//! holds for a short delay before booting. A second reset during that hold
//! finds the sentinel armed and stays in update mode.
//!
//! Quick boot (single reset boards): any reset that is not the result of an
//! expired quick-boot window enters update mode and opens the window. If no
//! host shows up before it closes, the bootloader resets into the
//! application with `QuickBootPending` set.

use crate::layout::{
    APP_START_ADDR, FLASH_SIZE, SENTINEL_FORCE, SENTINEL_NONE, SENTINEL_QUICK_BOOT,
};

/// Cause of the last reset, from the RSTC `RCAUSE` register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCause {
    PowerOn,
    BrownoutCore,
    BrownoutVdd,
    Nvm,
    External,
    Watchdog,
    System,
    Backup,
    Unknown,
}

impl ResetCause {
    /// Decode `RCAUSE`. Lower bits win if several are set.
    pub fn from_rcause(rcause: u8) -> Self {
        const CAUSES: [ResetCause; 8] = [
            ResetCause::PowerOn,
            ResetCause::BrownoutCore,
            ResetCause::BrownoutVdd,
            ResetCause::Nvm,
            ResetCause::External,
            ResetCause::Watchdog,
            ResetCause::System,
            ResetCause::Backup,
        ];

        CAUSES
            .iter()
            .enumerate()
            .find(|(bit, _)| rcause & (1 << bit) != 0)
            .map(|(_, cause)| *cause)
            .unwrap_or(ResetCause::Unknown)
    }

    pub fn is_power_on(self) -> bool {
        self == ResetCause::PowerOn
    }
}

/// Value of the persisted boot sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sentinel {
    None,
    ForceBootloader,
    QuickBootPending,
    /// Anything else, e.g. RAM contents after power loss.
    Other(u32),
}

impl Sentinel {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            SENTINEL_NONE => Sentinel::None,
            SENTINEL_FORCE => Sentinel::ForceBootloader,
            SENTINEL_QUICK_BOOT => Sentinel::QuickBootPending,
            other => Sentinel::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Sentinel::None => SENTINEL_NONE,
            Sentinel::ForceBootloader => SENTINEL_FORCE,
            Sentinel::QuickBootPending => SENTINEL_QUICK_BOOT,
            Sentinel::Other(raw) => raw,
        }
    }
}

/// Fixed inputs to the decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfig {
    /// Address of the application vector table.
    pub app_start: u32,
    /// Highest address a reset vector may point to.
    pub flash_size: u32,
    /// Open a quick-boot window instead of waiting for a double tap.
    pub quick_boot: bool,
}

impl BootConfig {
    /// Configuration for the board layout.
    pub const fn board(quick_boot: bool) -> Self {
        Self {
            app_start: APP_START_ADDR,
            flash_size: FLASH_SIZE,
            quick_boot,
        }
    }

    /// True if `reset_vector` points into application flash.
    pub fn reset_vector_valid(&self, reset_vector: u32) -> bool {
        (self.app_start..=self.flash_size).contains(&reset_vector)
    }
}

/// What the bootloader does after the decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootOutcome {
    JumpToApplication,
    RemainUpdateMode,
    /// Stay in update mode with the quick-boot window open.
    ArmQuickBootWindow,
    /// Wait for a second tap, then call [`finish_double_tap_hold`].
    HoldForDoubleTap,
}

/// Result of a boot decision (immutable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootDecision {
    pub outcome: BootOutcome,
    /// Value to store in the sentinel word before acting, if any.
    pub sentinel: Option<Sentinel>,
}

impl BootDecision {
    const fn new(outcome: BootOutcome, sentinel: Option<Sentinel>) -> Self {
        Self { outcome, sentinel }
    }

    /// Sentinel value after applying this decision to `current`.
    pub fn apply_to(&self, current: Sentinel) -> Sentinel {
        self.sentinel.unwrap_or(current)
    }
}

/// Decide what to do after a reset.
pub fn decide(
    config: &BootConfig,
    cause: ResetCause,
    sentinel: Sentinel,
    reset_vector: u32,
) -> BootDecision {
    if !config.reset_vector_valid(reset_vector) {
        return BootDecision::new(BootOutcome::RemainUpdateMode, None);
    }

    if config.quick_boot && (cause.is_power_on() || sentinel != Sentinel::QuickBootPending) {
        return BootDecision::new(
            BootOutcome::ArmQuickBootWindow,
            Some(Sentinel::QuickBootPending),
        );
    }

    if cause.is_power_on() {
        return BootDecision::new(BootOutcome::JumpToApplication, Some(Sentinel::None));
    }

    match sentinel {
        Sentinel::ForceBootloader => {
            BootDecision::new(BootOutcome::RemainUpdateMode, Some(Sentinel::None))
        }
        Sentinel::QuickBootPending => {
            BootDecision::new(BootOutcome::JumpToApplication, Some(Sentinel::None))
        }
        Sentinel::None | Sentinel::Other(_) => BootDecision::new(
            BootOutcome::HoldForDoubleTap,
            Some(Sentinel::ForceBootloader),
        ),
    }
}

/// Decision once a double-tap hold has passed without a second reset.
pub fn finish_double_tap_hold() -> BootDecision {
    BootDecision::new(BootOutcome::JumpToApplication, Some(Sentinel::None))
}

/// Sentinel to store before resetting into the application from update mode.
pub fn reset_into_app() -> Sentinel {
    Sentinel::QuickBootPending
}

/// Timer for the quick-boot window, on a wrapping millisecond clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuickBootWindow {
    armed: Option<(u32, u32)>,
}

impl QuickBootWindow {
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Open the window at `now_ms` for `duration_ms`.
    pub fn arm(&mut self, now_ms: u32, duration_ms: u32) {
        self.armed = Some((now_ms, duration_ms));
    }

    /// Close the window; a host has taken over.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn expired(&self, now_ms: u32) -> bool {
        match self.armed {
            Some((start, duration)) => now_ms.wrapping_sub(start) >= duration,
            None => false,
        }
    }
}
