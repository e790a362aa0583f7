// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for NVMCTRL encodings and the flash adapter.

use slotboot_common::layout::{FLASH_PAGE_SIZE, FLASH_SIZE};
use slotboot_common::nvm::{
    ctrla_for_programming, FlashAdapter, NvmCommand, NvmParam, CTRLA_CACHEDIS0,
    CTRLA_CACHEDIS1, CTRLA_WMODE_MASK,
};
use slotboot_common::sim::{SimNvm, SimOp};

fn adapter() -> FlashAdapter<SimNvm> {
    FlashAdapter::new(SimNvm::new(256, 64))
}

// =============================================================================
// Register encodings
// =============================================================================

#[test]
fn test_ctrlb_carries_command_key() {
    assert_eq!(NvmCommand::EraseBlock.ctrlb(), 0xA501);
    assert_eq!(NvmCommand::WriteQuadWord.ctrlb(), 0xA504);
    assert_eq!(NvmCommand::PageBufferClear.ctrlb(), 0xA515);
}

#[test]
fn test_ctrla_selects_manual_write_and_disables_caches() {
    // Automatic quad-word mode, suspend enabled, power-reduction bits set
    let ctrla = 0x0030 | 0x0080 | 0x0300;

    let programmed = ctrla_for_programming(ctrla);

    assert_eq!(programmed & CTRLA_WMODE_MASK, 0);
    assert_ne!(programmed & CTRLA_CACHEDIS0, 0);
    assert_ne!(programmed & CTRLA_CACHEDIS1, 0);
    assert_eq!(programmed & 0x0380, 0x0380);
}

#[test]
fn test_ctrla_for_programming_is_idempotent() {
    let once = ctrla_for_programming(0x0010);
    assert_eq!(ctrla_for_programming(once), once);
}

#[test]
fn test_param_decode_matches_board() {
    // PSZ = 6 (512-byte pages), NVMP = 1024 pages
    let param = NvmParam::decode((6 << 16) | 1024);

    assert_eq!(param.page_size, FLASH_PAGE_SIZE);
    assert_eq!(param.pages, 1024);
    assert_eq!(param.flash_size(), FLASH_SIZE);
    assert!(param.matches_layout());
}

#[test]
fn test_param_decode_ignores_unrelated_bits() {
    // SEE bits (31:28) set on top of the board value
    let param = NvmParam::decode(0xF000_0000 | (6 << 16) | 1024);
    assert!(param.matches_layout());
}

#[test]
fn test_param_rejects_other_parts() {
    // 1 MiB part
    assert!(!NvmParam::decode((6 << 16) | 2048).matches_layout());
    // 256-byte pages
    assert!(!NvmParam::decode((5 << 16) | 2048).matches_layout());
}

// =============================================================================
// Adapter primitives
// =============================================================================

#[test]
fn test_erase_block_resets_to_erased() {
    let mut flash = FlashAdapter::new(SimNvm::from_image(vec![0u8; 256], 64));

    flash.erase_block(64 + 12);

    let mem = flash.controller().memory();
    assert!(mem[..64].iter().all(|&b| b == 0));
    assert!(mem[64..128].iter().all(|&b| b == 0xFF));
    assert!(mem[128..].iter().all(|&b| b == 0));
    assert_eq!(flash.controller().erase_count(1), 1);
}

#[test]
fn test_write_words_clears_buffer_then_writes_chunks() {
    let mut flash = adapter();

    flash.write_words(32, &[1, 2, 3, 4, 5, 6, 7, 8]);

    assert_eq!(
        flash.controller().ops(),
        &[
            SimOp::PageBufferClear,
            SimOp::WriteQuadWord { addr: 32 },
            SimOp::WriteQuadWord { addr: 48 },
        ]
    );
    let mut back = [0u32; 8];
    flash.read(32, &mut back);
    assert_eq!(back, [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_write_words_pads_short_chunk() {
    let mut flash = adapter();

    flash.write_words(0, &[0x1111_1111, 0x2222_2222, 0x3333_3333, 0x4444_4444, 0x5555_5555]);

    let mut back = [0u32; 8];
    flash.read(0, &mut back);
    assert_eq!(back[4], 0x5555_5555);
    assert_eq!(&back[5..], &[0xFFFF_FFFF; 3]);
    assert_eq!(flash.controller().chunk_writes(), 2);
}

#[test]
fn test_programming_only_clears_bits() {
    let mut flash = adapter();

    flash.write_words(0, &[0xF0F0_F0F0; 4]);
    flash.write_words(0, &[0x0FFF_FFFF; 4]);

    let mut back = [0u32; 4];
    flash.read(0, &mut back);
    assert_eq!(back, [0x00F0_F0F0; 4]);
}

#[test]
fn test_busy_controller_is_polled_until_ready() {
    let mut flash = FlashAdapter::new(SimNvm::new(256, 64).with_busy_polls(5));

    flash.erase_block(0);
    flash.write_words(0, &[0; 4]);
    flash.wait_ready();

    // Three commands, each followed by five busy samples and one ready sample
    assert!(flash.controller().polls() >= 3 * 6);
    assert_eq!(flash.controller().memory()[..16], [0u8; 16]);
}

#[test]
#[should_panic(expected = "manual write mode")]
fn test_commit_without_manual_write_panics_in_sim() {
    let mut flash = adapter();
    flash.commit_chunk(0, &[0; 4]);
}

#[test]
#[should_panic(expected = "issued while busy")]
fn test_sim_rejects_command_while_busy() {
    use slotboot_common::nvm::NvmController;

    let mut nvm = SimNvm::new(256, 64).with_busy_polls(2);
    nvm.issue(NvmCommand::PageBufferClear);
    nvm.issue(NvmCommand::PageBufferClear);
}
