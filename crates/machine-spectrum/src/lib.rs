//! ZX Spectrum machine shell.
//!
//! Wraps the Z80 core in a frame-oriented execution loop: the machine runs
//! whole instructions until a frame boundary, breakpoint, halt, termination
//! point, or cancellation, and reports why it stopped. Peripherals hook in
//! through [`DeviceHooks`] and stay in phase via the per-tact hook on the
//! bus.

mod bus;
mod config;
mod device;
mod error;
mod machine;
mod rom;

pub use bus::SpectrumBus;
pub use config::{SpectrumConfig, SpectrumModel};
pub use device::{DeviceHooks, NullDevices};
pub use error::MachineError;
pub use machine::{
    CancelToken, ExecutionContext, ExecutionMode, MachineState, SpectrumMachine,
    TerminationReason,
};
pub use rom::{BundleRomSource, RomSource, load_model_rom, rom_resource_key};
