//! The Spectrum machine and its execution loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use cpu_z80::{Registers, Z80};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::bus::SpectrumBus;
use crate::config::{SpectrumConfig, SpectrumModel};
use crate::device::DeviceHooks;
use crate::error::MachineError;
use crate::rom::ROM_PAGE_SIZE;

/// Why the execution loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The frame completed.
    Normal,
    /// The CPU reached HALT while running in `UntilHalt` mode.
    UntilHalt,
    /// PC reached the configured termination point.
    UntilExecutionPoint,
    /// A breakpoint was hit.
    Breakpoint,
    /// The cancellation token was set.
    Cancelled,
}

/// How long the execution loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Run one frame.
    #[default]
    Normal,
    /// Run until the CPU halts.
    UntilHalt,
    /// Run until PC reaches the termination point.
    UntilExecutionPoint,
}

/// Loop-scoped configuration and the last termination report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionContext {
    pub mode: ExecutionMode,
    /// PC value that terminates an `UntilExecutionPoint` run.
    pub termination_point: Option<u16>,
    /// Written on every loop exit.
    pub last_reason: Option<TerminationReason>,
}

/// Cooperative cancellation handle for the execution loop.
///
/// Setting the token stops the loop at the next instruction boundary;
/// in-flight instructions always run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::Relaxed)
    }
}

/// Copyable snapshot of the externally visible machine state.
///
/// Readers on other threads observe the machine only through this snapshot,
/// refreshed at loop exits; live state is single-threaded by design.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineState {
    pub registers: Registers,
    pub tacts: u64,
    pub frame_count: u64,
    pub halted: bool,
}

/// The ZX Spectrum machine shell.
pub struct SpectrumMachine {
    cpu: Z80,
    bus: SpectrumBus,
    config: SpectrumConfig,
    context: ExecutionContext,
    breakpoints: HashSet<u16>,
    /// One-shot "do not stop here on first entry" guard.
    startup_breakpoint: Option<u16>,
    clock_multiplier: u32,
    /// Multiplier change staged for the next frame boundary.
    pending_multiplier: Option<u32>,
    frame_completed: bool,
    /// Tacts the boundary-crossing instruction carried into the next frame.
    frame_overflow: u64,
    frame_count: u64,
    cancel: CancelToken,
    state: Arc<RwLock<MachineState>>,
}

impl SpectrumMachine {
    /// Create a machine with the default device hooks.
    ///
    /// # Errors
    ///
    /// Fails on unsupported models and wrongly sized ROMs.
    pub fn new(config: SpectrumConfig) -> Result<Self, MachineError> {
        Self::with_device(config, Box::new(crate::device::NullDevices))
    }

    /// Create a machine with custom device hooks.
    ///
    /// # Errors
    ///
    /// Fails on unsupported models and wrongly sized ROMs.
    pub fn with_device(
        config: SpectrumConfig,
        device: Box<dyn DeviceHooks>,
    ) -> Result<Self, MachineError> {
        if config.model != SpectrumModel::Spectrum48K {
            return Err(MachineError::UnsupportedModel(config.model));
        }
        if config.rom.len() != ROM_PAGE_SIZE {
            return Err(MachineError::RomSize {
                expected: ROM_PAGE_SIZE,
                actual: config.rom.len(),
            });
        }

        debug!(
            "creating {:?} machine: {} Hz, {} tacts/frame",
            config.model, config.clock_hz, config.tacts_per_frame
        );

        let bus = SpectrumBus::new(config.rom.clone(), device);
        Ok(Self {
            cpu: Z80::new(),
            bus,
            config,
            context: ExecutionContext::default(),
            breakpoints: HashSet::new(),
            startup_breakpoint: None,
            clock_multiplier: 1,
            pending_multiplier: None,
            frame_completed: true,
            frame_overflow: 0,
            frame_count: 0,
            cancel: CancelToken::default(),
            state: Arc::new(RwLock::new(MachineState::default())),
        })
    }

    /// Idempotent re-initialisation after peripheral or config changes.
    ///
    /// Revalidates the configuration, reattaches the ROM, and restarts the
    /// frame bookkeeping. RAM and CPU state survive.
    ///
    /// # Errors
    ///
    /// Fails on wrongly sized ROMs or an invalid staged multiplier.
    pub fn configure(&mut self) -> Result<(), MachineError> {
        if self.config.rom.len() != ROM_PAGE_SIZE {
            return Err(MachineError::RomSize {
                expected: ROM_PAGE_SIZE,
                actual: self.config.rom.len(),
            });
        }
        if let Some(multiplier) = self.pending_multiplier
            && !(1..=16).contains(&multiplier)
        {
            return Err(MachineError::InvalidMultiplier(multiplier));
        }

        self.bus.attach_rom(self.config.rom.clone());
        self.frame_completed = true;
        self.frame_overflow = 0;
        debug!("machine configured");
        Ok(())
    }

    /// Hard reset: power-on register state, RAM cleared, frame state fresh.
    pub fn hard_reset(&mut self) {
        self.cpu.hard_reset();
        self.bus.clear_ram();
        self.frame_completed = true;
        self.frame_overflow = 0;
        self.frame_count = 0;
        self.publish_state();
    }

    /// Soft reset: PC to 0, interrupts disabled, RAM preserved.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.frame_completed = true;
        self.frame_overflow = 0;
        self.publish_state();
    }

    /// Run the machine until a frame boundary, breakpoint, termination
    /// point, halt (in `UntilHalt` mode), or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Invariant`] when the host bus breaks the
    /// tact-advancement contract; termination itself is never an error.
    pub fn execute_machine_loop(&mut self) -> Result<TerminationReason, MachineError> {
        self.context.last_reason = None;

        // Startup-breakpoint gate: stepping off a breakpoint must not
        // immediately re-trigger it.
        let entry_pc = self.cpu.regs.pc;
        if self.startup_breakpoint != Some(entry_pc) && self.breakpoints.contains(&entry_pc)
        {
            self.startup_breakpoint = Some(entry_pc);
            return Ok(self.finish(TerminationReason::Breakpoint));
        }
        self.startup_breakpoint = None;

        loop {
            if self.frame_completed {
                if let Some(multiplier) = self.pending_multiplier.take() {
                    debug!("adopting clock multiplier {multiplier}");
                    self.clock_multiplier = multiplier;
                }
                self.start_frame();
            }

            let frame_tact = self.bus.frame_tact();
            let int_active = self.bus.device().should_raise_interrupt(frame_tact);
            self.cpu.set_int(int_active);

            let tacts_before = self.cpu.tacts();
            self.cpu.step(&mut self.bus);
            if self.cpu.tacts() == tacts_before {
                return Err(MachineError::Invariant(
                    "tact counter did not advance across an instruction",
                ));
            }

            let pc = self.cpu.regs.pc;
            self.bus.device_mut().after_instruction(pc);

            if self.cancel.take() {
                return Ok(self.finish(TerminationReason::Cancelled));
            }
            if self.context.mode == ExecutionMode::UntilExecutionPoint
                && self.context.termination_point == Some(pc)
            {
                return Ok(self.finish(TerminationReason::UntilExecutionPoint));
            }
            if self.breakpoints.contains(&pc) {
                self.startup_breakpoint = Some(pc);
                return Ok(self.finish(TerminationReason::Breakpoint));
            }
            if self.context.mode == ExecutionMode::UntilHalt && self.cpu.is_halted() {
                return Ok(self.finish(TerminationReason::UntilHalt));
            }

            let frame_tacts = self.frame_tacts();
            if self.bus.frame_tact() >= frame_tacts {
                self.frame_overflow = self.bus.frame_tact() - frame_tacts;
                self.frame_completed = true;
                break;
            }
        }

        self.frame_count += 1;
        Ok(self.finish(TerminationReason::Normal))
    }

    /// Base CPU clock in Hz, before the multiplier.
    #[must_use]
    pub const fn base_clock_frequency(&self) -> u32 {
        self.config.clock_hz
    }

    /// Active clock multiplier.
    #[must_use]
    pub const fn clock_multiplier(&self) -> u32 {
        self.clock_multiplier
    }

    /// Stage a clock-multiplier change; it takes effect at the next frame
    /// boundary to keep timing coherent.
    ///
    /// # Errors
    ///
    /// Fails when the multiplier is outside 1..=16.
    pub fn set_clock_multiplier(&mut self, multiplier: u32) -> Result<(), MachineError> {
        if !(1..=16).contains(&multiplier) {
            return Err(MachineError::InvalidMultiplier(multiplier));
        }
        self.pending_multiplier = Some(multiplier);
        Ok(())
    }

    /// The one-shot startup breakpoint stamped by the last breakpoint hit.
    #[must_use]
    pub const fn last_startup_breakpoint(&self) -> Option<u16> {
        self.startup_breakpoint
    }

    #[must_use]
    pub const fn execution_context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn execution_context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Add a breakpoint at `addr`.
    pub fn add_breakpoint(&mut self, addr: u16) {
        self.breakpoints.insert(addr);
    }

    /// Remove the breakpoint at `addr`.
    pub fn remove_breakpoint(&mut self, addr: u16) {
        self.breakpoints.remove(&addr);
    }

    /// Remove all breakpoints.
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    #[must_use]
    pub fn has_breakpoint(&self, addr: u16) -> bool {
        self.breakpoints.contains(&addr)
    }

    /// Cancellation handle for the execution loop. Clone it into the thread
    /// that needs to stop the machine.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Snapshot handle for cross-thread readers. The snapshot refreshes at
    /// every loop exit.
    #[must_use]
    pub fn state_handle(&self) -> Arc<RwLock<MachineState>> {
        Arc::clone(&self.state)
    }

    /// Completed frame count.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SpectrumBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SpectrumBus {
        &mut self.bus
    }

    /// Effective frame length in T-states at the current multiplier.
    fn frame_tacts(&self) -> u64 {
        u64::from(self.config.tacts_per_frame) * u64::from(self.clock_multiplier)
    }

    fn start_frame(&mut self) {
        self.bus.start_frame(self.frame_overflow);
        self.frame_overflow = 0;
        self.bus.device_mut().on_new_frame();
        self.frame_completed = false;
    }

    fn finish(&mut self, reason: TerminationReason) -> TerminationReason {
        self.context.last_reason = Some(reason);
        trace!("machine loop terminated: {reason:?}");
        self.publish_state();
        reason
    }

    fn publish_state(&mut self) {
        if let Ok(mut state) = self.state.write() {
            *state = MachineState {
                registers: self.cpu.regs,
                tacts: self.cpu.tacts(),
                frame_count: self.frame_count,
                halted: self.cpu.is_halted(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_machine() -> SpectrumMachine {
        SpectrumMachine::new(SpectrumConfig::spectrum_48k(vec![0; ROM_PAGE_SIZE])).unwrap()
    }

    #[test]
    fn rejects_unsupported_model() {
        let config = SpectrumConfig {
            model: SpectrumModel::Spectrum128K,
            rom: vec![0; ROM_PAGE_SIZE],
            clock_hz: 3_500_000,
            tacts_per_frame: 69_888,
        };
        assert!(matches!(
            SpectrumMachine::new(config),
            Err(MachineError::UnsupportedModel(SpectrumModel::Spectrum128K))
        ));
    }

    #[test]
    fn rejects_wrong_rom_size() {
        let config = SpectrumConfig::spectrum_48k(vec![0; 100]);
        assert!(matches!(
            SpectrumMachine::new(config),
            Err(MachineError::RomSize { actual: 100, .. })
        ));
    }

    #[test]
    fn multiplier_validation() {
        let mut machine = make_machine();
        assert!(machine.set_clock_multiplier(0).is_err());
        assert!(machine.set_clock_multiplier(17).is_err());
        assert!(machine.set_clock_multiplier(2).is_ok());
        // Not adopted until a frame boundary
        assert_eq!(machine.clock_multiplier(), 1);
    }

    #[test]
    fn multiplier_adopted_at_frame_boundary() {
        let mut machine = make_machine();
        machine.set_clock_multiplier(2).unwrap();
        let reason = machine.execute_machine_loop().unwrap();
        assert_eq!(reason, TerminationReason::Normal);
        assert_eq!(machine.clock_multiplier(), 2);
        // The doubled frame really ran twice as many tacts
        assert!(machine.cpu().tacts() >= 69_888);
    }

    #[test]
    fn configure_is_idempotent() {
        let mut machine = make_machine();
        machine.configure().unwrap();
        machine.configure().unwrap();
    }

    #[test]
    fn hard_reset_clears_ram_and_registers() {
        let mut machine = make_machine();
        machine.bus_mut().poke(0x8000, 0xAB);
        machine.cpu_mut().regs.pc = 0x1234;

        machine.hard_reset();
        assert_eq!(machine.bus().peek(0x8000), 0);
        assert_eq!(machine.cpu().regs.pc, 0);
        assert_eq!(machine.cpu().regs.af(), 0xFFFF);
        assert_eq!(machine.cpu().regs.sp, 0xFFFF);
        assert_eq!(machine.cpu().tacts(), 0);
    }

    #[test]
    fn soft_reset_preserves_ram() {
        let mut machine = make_machine();
        machine.bus_mut().poke(0x8000, 0xAB);
        machine.reset();
        assert_eq!(machine.bus().peek(0x8000), 0xAB);
        assert_eq!(machine.cpu().regs.pc, 0);
    }

    #[test]
    fn state_handle_reflects_loop_exit() {
        let mut machine = make_machine();
        let handle = machine.state_handle();
        machine.execute_machine_loop().unwrap();

        let state = handle.read().unwrap();
        assert!(state.tacts >= 69_888);
        assert_eq!(state.frame_count, 1);
    }
}
