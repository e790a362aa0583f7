// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Caller-side errors of the flash API.
//!
//! Hardware faults are not represented here: a stuck controller hangs inside
//! `wait_ready` and recovery is a watchdog reset.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Address is not aligned to the required granule.
    Misaligned { addr: u32 },
    /// Address range falls outside the flash, or below the application base.
    OutOfRange { addr: u32, len: u32 },
    /// Image range runs past the end of its source region.
    SourceOutOfRange { offset: u32, len: u32 },
    /// Row data is not exactly one row long.
    BadLength { expected: u32, actual: u32 },
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Misaligned { addr } => write!(f, "address 0x{:08x} is not row aligned", addr),
            Self::OutOfRange { addr, len } => write!(
                f,
                "range 0x{:08x}..0x{:08x} is outside writable flash",
                addr,
                addr.wrapping_add(len)
            ),
            Self::SourceOutOfRange { offset, len } => write!(
                f,
                "image of {} bytes at offset 0x{:08x} runs past the end of its source",
                len, offset
            ),
            Self::BadLength { expected, actual } => {
                write!(f, "row data is {} bytes, expected {}", actual, expected)
            }
        }
    }
}

impl core::error::Error for FlashError {}
