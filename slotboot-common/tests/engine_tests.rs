// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the flash programming engine against the simulated controller.

use slotboot_common::engine::{FlashEngine, RowOutcome};
use slotboot_common::error::FlashError;
use slotboot_common::sim::{SimNvm, SimOp};

/// 4 blocks of 4 rows of 32 bytes: 512 bytes of flash, 128-byte blocks.
type Engine = FlashEngine<SimNvm, 4, 4, 8>;

const ROW: u32 = Engine::ROW_SIZE;
const BLOCK: u32 = Engine::BLOCK_SIZE;

fn pattern(seed: u8) -> Vec<u8> {
    (0..ROW as usize)
        .map(|i| seed.wrapping_mul(31).wrapping_add(i as u8))
        .collect()
}

/// Flash image where every row holds `pattern(row index)`.
fn populated_image() -> Vec<u8> {
    (0..Engine::FLASH_SIZE / ROW)
        .flat_map(|r| pattern(r as u8))
        .collect()
}

fn engine_with(image: Vec<u8>) -> Engine {
    Engine::new(SimNvm::from_image(image, BLOCK), 0)
}

fn erased_engine() -> Engine {
    Engine::new(SimNvm::new(Engine::FLASH_SIZE, BLOCK), 0)
}

fn row_at(engine: &Engine, addr: u32) -> &[u8] {
    &engine.controller().memory()[addr as usize..(addr + ROW) as usize]
}

// =============================================================================
// Geometry
// =============================================================================

#[test]
fn test_geometry_constants() {
    assert_eq!(ROW, 32);
    assert_eq!(BLOCK, 128);
    assert_eq!(Engine::FLASH_SIZE, 512);
}

// =============================================================================
// Unchanged rows
// =============================================================================

#[test]
fn test_identical_row_is_skipped() {
    let mut engine = engine_with(populated_image());

    let outcome = engine.write_row(ROW, &pattern(1)).unwrap();

    assert_eq!(outcome, RowOutcome::Unchanged);
    assert!(engine.controller().ops().is_empty());
    assert_eq!(engine.controller().total_erases(), 0);
    assert!(engine.session().is_unchanged(0, 1));
    assert!(!engine.session().is_erased(0));
}

#[test]
fn test_identical_rows_leave_siblings_untouched() {
    let image = populated_image();
    let mut engine = engine_with(image.clone());

    for r in 0..4u32 {
        engine.write_row(r * ROW, &pattern(r as u8)).unwrap();
    }

    assert_eq!(engine.controller().memory(), image.as_slice());
    assert_eq!(engine.session().pending_rows(0), 4);
}

#[test]
fn test_erased_row_matching_erased_data_is_skipped() {
    let mut engine = erased_engine();

    let outcome = engine.write_row(0, &[0xFF; ROW as usize]).unwrap();

    assert_eq!(outcome, RowOutcome::Unchanged);
    assert_eq!(engine.controller().total_erases(), 0);
}

// =============================================================================
// Erase preserves skipped rows
// =============================================================================

#[test]
fn test_erase_restores_previously_skipped_row() {
    let image = populated_image();
    let mut engine = engine_with(image.clone());

    assert_eq!(engine.write_row(0, &pattern(0)).unwrap(), RowOutcome::Unchanged);
    let outcome = engine.write_row(ROW, &pattern(200)).unwrap();

    assert_eq!(outcome, RowOutcome::ErasedAndProgrammed { restored: 1 });
    assert_eq!(row_at(&engine, 0), &image[..ROW as usize]);
    assert_eq!(row_at(&engine, ROW), pattern(200).as_slice());
    assert_eq!(engine.controller().erase_count(0), 1);
}

#[test]
fn test_erase_restores_every_skipped_row_in_block() {
    let image = populated_image();
    let mut engine = engine_with(image.clone());

    engine.write_row(0, &pattern(0)).unwrap();
    engine.write_row(2 * ROW, &pattern(2)).unwrap();
    engine.write_row(3 * ROW, &pattern(3)).unwrap();
    let outcome = engine.write_row(ROW, &pattern(77)).unwrap();

    assert_eq!(outcome, RowOutcome::ErasedAndProgrammed { restored: 3 });
    for r in [0u32, 2, 3] {
        let start = (r * ROW) as usize;
        assert_eq!(row_at(&engine, r * ROW), &image[start..start + ROW as usize]);
    }
    assert_eq!(row_at(&engine, ROW), pattern(77).as_slice());
}

#[test]
fn test_rows_not_seen_this_session_are_lost_on_erase() {
    let mut engine = engine_with(populated_image());

    engine.write_row(0, &pattern(99)).unwrap();

    assert!(row_at(&engine, ROW).iter().all(|&b| b == 0xFF));
    assert!(row_at(&engine, 3 * ROW).iter().all(|&b| b == 0xFF));
}

#[test]
fn test_erase_happens_before_any_programming() {
    let mut engine = engine_with(populated_image());

    engine.write_row(0, &pattern(0)).unwrap();
    engine.write_row(ROW, &pattern(50)).unwrap();

    let ops = engine.controller().ops();
    assert_eq!(ops[0], SimOp::EraseBlock { block: 0 });
    assert!(ops[1..].iter().all(|op| !matches!(op, SimOp::EraseBlock { .. })));
}

#[test]
fn test_rewriting_a_skipped_row_with_new_data() {
    let mut engine = engine_with(populated_image());

    engine.write_row(0, &pattern(0)).unwrap();
    let outcome = engine.write_row(0, &pattern(123)).unwrap();

    // The row being replaced is not restored over itself
    assert_eq!(outcome, RowOutcome::ErasedAndProgrammed { restored: 0 });
    assert_eq!(row_at(&engine, 0), pattern(123).as_slice());
    assert!(!engine.session().is_unchanged(0, 0));
}

#[test]
fn test_other_blocks_are_not_touched() {
    let image = populated_image();
    let mut engine = engine_with(image.clone());

    engine.write_row(BLOCK, &pattern(42)).unwrap();

    assert_eq!(engine.controller().erase_count(0), 0);
    assert_eq!(engine.controller().erase_count(1), 1);
    assert_eq!(&engine.controller().memory()[..BLOCK as usize], &image[..BLOCK as usize]);
    assert_eq!(
        &engine.controller().memory()[2 * BLOCK as usize..],
        &image[2 * BLOCK as usize..]
    );
}

// =============================================================================
// At most one erase per block per session
// =============================================================================

#[test]
fn test_block_erased_once_for_all_rows() {
    let mut engine = engine_with(populated_image());

    let outcomes: Vec<_> = (0..4u32)
        .map(|r| engine.write_row(r * ROW, &pattern(100 + r as u8)).unwrap())
        .collect();

    assert_eq!(outcomes[0], RowOutcome::ErasedAndProgrammed { restored: 0 });
    assert!(outcomes[1..].iter().all(|o| *o == RowOutcome::Programmed));
    assert_eq!(engine.controller().erase_count(0), 1);
    for r in 0..4u32 {
        assert_eq!(row_at(&engine, r * ROW), pattern(100 + r as u8).as_slice());
    }
}

#[test]
fn test_whole_flash_rewrite_erases_each_block_once() {
    let mut engine = engine_with(populated_image());

    for r in 0..Engine::FLASH_SIZE / ROW {
        engine.write_row(r * ROW, &pattern(r as u8 ^ 0x5A)).unwrap();
    }

    for block in 0..4 {
        assert_eq!(engine.controller().erase_count(block), 1);
        assert!(engine.session().is_erased(block));
    }
}

#[test]
fn test_begin_session_forgets_erased_blocks() {
    let mut engine = engine_with(populated_image());

    engine.write_row(0, &pattern(10)).unwrap();
    engine.begin_session();
    assert!(!engine.session().is_erased(0));

    engine.write_row(ROW, &pattern(11)).unwrap();

    assert_eq!(engine.controller().erase_count(0), 2);
}

// =============================================================================
// Chunked programming
// =============================================================================

#[test]
fn test_row_is_programmed_in_quad_words() {
    let mut engine = erased_engine();

    engine.write_row(2 * ROW, &pattern(7)).unwrap();

    let writes: Vec<_> = engine
        .controller()
        .ops()
        .iter()
        .filter_map(|op| match op {
            SimOp::WriteQuadWord { addr } => Some(*addr),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![2 * ROW, 2 * ROW + 16]);
}

#[test]
fn test_short_row_pads_final_chunk_with_erased_value() {
    // 24-byte rows: the second quad word carries two words of padding
    type Odd = FlashEngine<SimNvm, 2, 4, 6>;
    let mut image = vec![0xFF; Odd::FLASH_SIZE as usize];
    image[0..24].fill(0x00);
    let mut engine = Odd::new(SimNvm::from_image(image, Odd::BLOCK_SIZE), 0);

    let data: Vec<u8> = (1..=24).collect();
    engine.write_row(0, &data).unwrap();

    let mem = engine.controller().memory();
    assert_eq!(&mem[..24], data.as_slice());
    assert!(mem[24..32].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_writes_wait_for_a_slow_controller() {
    let sim = SimNvm::from_image(populated_image(), BLOCK).with_busy_polls(3);
    let mut engine = Engine::new(sim, 0);

    engine.write_row(0, &pattern(0)).unwrap();
    engine.write_row(ROW, &pattern(33)).unwrap();

    assert_eq!(row_at(&engine, ROW), pattern(33).as_slice());
    assert!(engine.controller().polls() > engine.controller().ops().len() as u64 * 3);
}

// =============================================================================
// Argument validation
// =============================================================================

#[test]
fn test_misaligned_row_is_rejected() {
    let mut engine = erased_engine();

    let err = engine.write_row(ROW + 4, &pattern(0)).unwrap_err();

    assert_eq!(err, FlashError::Misaligned { addr: ROW + 4 });
    assert!(engine.controller().ops().is_empty());
}

#[test]
fn test_wrong_row_length_is_rejected() {
    let mut engine = erased_engine();

    let err = engine.write_row(0, &[0u8; 31]).unwrap_err();

    assert_eq!(err, FlashError::BadLength { expected: 32, actual: 31 });
}

#[test]
fn test_row_past_end_of_flash_is_rejected() {
    let mut engine = erased_engine();

    let err = engine.write_row(Engine::FLASH_SIZE, &pattern(0)).unwrap_err();

    assert_eq!(err, FlashError::OutOfRange { addr: 512, len: 32 });
}

#[test]
fn test_row_below_floor_is_rejected() {
    let mut engine = Engine::new(SimNvm::new(Engine::FLASH_SIZE, BLOCK), BLOCK);

    let err = engine.write_row(BLOCK - ROW, &pattern(0)).unwrap_err();

    assert!(matches!(err, FlashError::OutOfRange { .. }));
    assert!(engine.write_row(BLOCK, &pattern(0)).is_ok());
}

// =============================================================================
// erase_to_end
// =============================================================================

#[test]
fn test_erase_to_end_erases_remaining_blocks() {
    let image = populated_image();
    let mut engine = engine_with(image.clone());

    let blocks = engine.erase_to_end(2 * BLOCK).unwrap();

    assert_eq!(blocks, 2);
    let mem = engine.controller().memory();
    assert_eq!(&mem[..2 * BLOCK as usize], &image[..2 * BLOCK as usize]);
    assert!(mem[2 * BLOCK as usize..].iter().all(|&b| b == 0xFF));
    assert_eq!(engine.controller().erase_count(1), 0);
}

#[test]
fn test_write_after_erase_to_end_does_not_erase_again() {
    let mut engine = engine_with(populated_image());

    engine.erase_to_end(BLOCK).unwrap();
    let outcome = engine.write_row(BLOCK + ROW, &pattern(9)).unwrap();

    assert_eq!(outcome, RowOutcome::Programmed);
    assert_eq!(engine.controller().erase_count(1), 1);
}

#[test]
fn test_erase_to_end_requires_block_alignment() {
    let mut engine = erased_engine();

    assert_eq!(
        engine.erase_to_end(ROW),
        Err(FlashError::Misaligned { addr: ROW })
    );
    assert_eq!(engine.controller().total_erases(), 0);
}

#[test]
fn test_erase_to_end_respects_floor() {
    let mut engine = Engine::new(SimNvm::new(Engine::FLASH_SIZE, BLOCK), BLOCK);

    assert!(matches!(engine.erase_to_end(0), Err(FlashError::OutOfRange { .. })));
    assert_eq!(engine.erase_to_end(BLOCK), Ok(3));
}
