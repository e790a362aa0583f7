// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Slot directory and flash image files.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use slotboot_common::engine::BoardEngine;
use slotboot_common::layout::{
    APP_START_ADDR, ERASED_BYTE, FLASH_BLOCK_SIZE, FLASH_SIZE, MAX_SLOTS, SLOT_SIZE,
};
use slotboot_common::sim::SimNvm;

/// One entry of the slot directory.
pub struct Slot {
    pub index: usize,
    pub path: PathBuf,
    /// `None` when the slot file does not exist.
    pub size: Option<u64>,
}

impl Slot {
    pub fn label(&self) -> String {
        match self.size {
            Some(_) => format!("Game {}", self.index),
            None => "Empty".to_string(),
        }
    }
}

/// Directory of `slotN.bin` files standing in for the QSPI slot area.
pub struct SlotDir {
    dir: PathBuf,
}

impl SlotDir {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("slot{}.bin", index))
    }

    pub fn list(&self) -> Vec<Slot> {
        (0..MAX_SLOTS)
            .map(|index| {
                let path = self.path(index);
                let size = fs::metadata(&path).ok().map(|m| m.len());
                Slot { index, path, size }
            })
            .collect()
    }

    /// Read a slot image, checking it exists, is not empty, and fits the
    /// application area.
    pub fn read(&self, index: usize) -> Result<Vec<u8>> {
        if index >= MAX_SLOTS {
            bail!("Invalid slot index {} (0..{})", index, MAX_SLOTS - 1);
        }

        let path = self.path(index);
        let image = match fs::read(&path) {
            Ok(image) => image,
            Err(e) if e.kind() == ErrorKind::NotFound => bail!("Slot {} is empty", index),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        if image.is_empty() {
            bail!("Slot {} is empty", index);
        }
        if image.len() as u64 > SLOT_SIZE as u64 {
            bail!(
                "Slot {} is {} bytes, the application area holds {}",
                index,
                image.len(),
                SLOT_SIZE
            );
        }
        Ok(image)
    }
}

/// The internal flash, backed by a file of exactly `FLASH_SIZE` bytes.
pub struct FlashImage {
    path: PathBuf,
    data: Vec<u8>,
}

impl FlashImage {
    /// Open the image, or start from fully erased flash if the file is missing.
    pub fn open(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => vec![ERASED_BYTE; FLASH_SIZE as usize],
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        if data.len() != FLASH_SIZE as usize {
            bail!(
                "{} is {} bytes, expected a {} byte flash image",
                path.display(),
                data.len(),
                FLASH_SIZE
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// The application area, `len` bytes from the application base.
    pub fn app(&self, len: usize) -> &[u8] {
        let start = APP_START_ADDR as usize;
        &self.data[start..start + len]
    }

    /// Word at `addr`, little endian.
    pub fn word(&self, addr: u32) -> u32 {
        let at = addr as usize;
        u32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ])
    }

    /// Hand the contents to a flash engine that protects the bootloader area.
    pub fn into_engine(self) -> (PathBuf, BoardEngine<SimNvm>) {
        let nvm = SimNvm::from_image(self.data, FLASH_BLOCK_SIZE);
        (self.path, BoardEngine::new(nvm, APP_START_ADDR))
    }

    /// Take the contents back from an engine.
    pub fn from_engine(path: PathBuf, engine: BoardEngine<SimNvm>) -> Self {
        Self {
            path,
            data: engine.into_inner().into_image(),
        }
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, &self.data)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_reports_missing_slots_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("slot1.bin"), [1u8; 10]).unwrap();

        let slots = SlotDir::new(dir.path()).list();

        assert_eq!(slots.len(), MAX_SLOTS);
        assert_eq!(slots[0].size, None);
        assert_eq!(slots[0].label(), "Empty");
        assert_eq!(slots[1].size, Some(10));
        assert_eq!(slots[1].label(), "Game 1");
    }

    #[test]
    fn test_read_rejects_bad_slots() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("slot0.bin"), b"").unwrap();
        fs::write(dir.path().join("slot1.bin"), vec![0u8; SLOT_SIZE as usize + 1]).unwrap();
        let slots = SlotDir::new(dir.path());

        assert!(slots.read(0).is_err());
        assert!(slots.read(1).is_err());
        assert!(slots.read(2).is_err());
        assert!(slots.read(MAX_SLOTS).is_err());
    }

    #[test]
    fn test_missing_flash_image_starts_erased() {
        let dir = tempfile::tempdir().unwrap();

        let flash = FlashImage::open(&dir.path().join("flash.bin")).unwrap();

        assert_eq!(flash.data.len(), FLASH_SIZE as usize);
        assert!(flash.data.iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(flash.word(APP_START_ADDR + 4), 0xFFFF_FFFF);
    }

    #[test]
    fn test_flash_image_of_wrong_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");
        fs::write(&path, [0u8; 100]).unwrap();

        assert!(FlashImage::open(&path).is_err());
    }

    #[test]
    fn test_engine_round_trip_saves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");
        let row = vec![0x42u8; 512];

        let (path_back, mut engine) = FlashImage::open(&path).unwrap().into_engine();
        engine.write_row(APP_START_ADDR, &row).unwrap();
        FlashImage::from_engine(path_back, engine).save().unwrap();

        let reopened = FlashImage::open(&path).unwrap();
        assert_eq!(reopened.app(512), row.as_slice());
    }
}
