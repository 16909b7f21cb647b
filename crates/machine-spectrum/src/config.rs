//! Spectrum model configuration.

use serde::{Deserialize, Serialize};

/// The Spectrum family.
///
/// Only the 48K model is wired up in this crate; configuring another model
/// is a configuration error, not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectrumModel {
    Spectrum48K,
    Spectrum128K,
    SpectrumPlus2,
    SpectrumPlus3,
}

impl SpectrumModel {
    /// The name used in ROM resource keys (`Roms/<name>/<name>.rom`).
    #[must_use]
    pub const fn rom_name(self) -> &'static str {
        match self {
            Self::Spectrum48K => "48",
            Self::Spectrum128K => "128",
            Self::SpectrumPlus2 => "Plus2",
            Self::SpectrumPlus3 => "Plus3",
        }
    }

    /// Number of 16K ROM pages the model ships with.
    #[must_use]
    pub const fn rom_pages(self) -> u8 {
        match self {
            Self::Spectrum48K => 1,
            Self::Spectrum128K | Self::SpectrumPlus2 => 2,
            Self::SpectrumPlus3 => 4,
        }
    }
}

/// Configuration for creating a Spectrum machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumConfig {
    pub model: SpectrumModel,
    /// ROM data. Must be 16,384 bytes for the 48K model.
    pub rom: Vec<u8>,
    /// Base CPU clock in Hz (before the multiplier).
    pub clock_hz: u32,
    /// T-states per video frame at multiplier 1.
    pub tacts_per_frame: u32,
}

impl SpectrumConfig {
    /// Standard 48K PAL configuration: 3.5 MHz, 69,888 tacts per frame.
    #[must_use]
    pub fn spectrum_48k(rom: Vec<u8>) -> Self {
        Self {
            model: SpectrumModel::Spectrum48K,
            rom,
            clock_hz: 3_500_000,
            tacts_per_frame: 69_888,
        }
    }
}
