//! ROM resource handling.
//!
//! ROM blobs are opaque byte arrays resolved from a resource bundle keyed by
//! `Roms/<name>/<name>[-<page>].rom`. The machine core performs no file I/O;
//! hosts implement [`RomSource`] over whatever storage they have.

use std::collections::HashMap;

use log::debug;

use crate::config::SpectrumModel;
use crate::error::MachineError;

/// 16K ROM page size shared by the whole family.
pub const ROM_PAGE_SIZE: usize = 0x4000;

/// Build the resource key for a model ROM page.
///
/// Single-page models use `Roms/<name>/<name>.rom`; multi-page models append
/// the page index: `Roms/128/128-0.rom`.
#[must_use]
pub fn rom_resource_key(name: &str, page: Option<u8>) -> String {
    match page {
        Some(page) => format!("Roms/{name}/{name}-{page}.rom"),
        None => format!("Roms/{name}/{name}.rom"),
    }
}

/// Resolves ROM resource keys to bytes.
pub trait RomSource {
    /// Load the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::MissingRom`] when the key is not present.
    fn load(&self, key: &str) -> Result<Vec<u8>, MachineError>;
}

/// In-memory ROM bundle.
#[derive(Debug, Default)]
pub struct BundleRomSource {
    entries: HashMap<String, Vec<u8>>,
}

impl BundleRomSource {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Store a blob under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(key.into(), data);
    }
}

impl RomSource for BundleRomSource {
    fn load(&self, key: &str) -> Result<Vec<u8>, MachineError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| MachineError::MissingRom(key.to_string()))
    }
}

/// Load and validate the full ROM image for `model` from `source`.
///
/// Pages are concatenated in page order. Each page must be exactly 16K.
///
/// # Errors
///
/// Returns [`MachineError::MissingRom`] for unresolvable keys and
/// [`MachineError::RomSize`] for wrongly sized pages.
pub fn load_model_rom(
    source: &dyn RomSource,
    model: SpectrumModel,
) -> Result<Vec<u8>, MachineError> {
    let name = model.rom_name();
    let pages = model.rom_pages();

    let mut rom = Vec::with_capacity(ROM_PAGE_SIZE * pages as usize);
    for page in 0..pages {
        let key = if pages == 1 {
            rom_resource_key(name, None)
        } else {
            rom_resource_key(name, Some(page))
        };
        let data = source.load(&key)?;
        if data.len() != ROM_PAGE_SIZE {
            return Err(MachineError::RomSize {
                expected: ROM_PAGE_SIZE,
                actual: data.len(),
            });
        }
        debug!("loaded ROM page {key} ({} bytes)", data.len());
        rom.extend_from_slice(&data);
    }
    Ok(rom)
}
