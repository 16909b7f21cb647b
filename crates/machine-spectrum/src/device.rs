//! Peripheral hook surface.

/// T-states at the start of a frame during which the ULA holds INT low.
pub const INT_ACTIVE_TACTS: u64 = 32;

/// Hooks through which peripheral hardware stays in lockstep with the CPU.
///
/// The bus calls [`DeviceHooks::on_tact`] once per T-state; the execution
/// loop calls the remaining hooks at well-defined points. All methods have
/// no-op defaults except the INT line, which follows the 48K ULA's timing.
pub trait DeviceHooks {
    /// Called once per T-state, after the clock has advanced.
    /// Must perform bounded work and never block.
    fn on_tact(&mut self, frame_tact: u64) {
        let _ = frame_tact;
    }

    /// Whether the INT line is asserted at this frame tact.
    fn should_raise_interrupt(&self, frame_tact: u64) -> bool {
        frame_tact < INT_ACTIVE_TACTS
    }

    /// Called at the start of each frame, before any instruction runs.
    fn on_new_frame(&mut self) {}

    /// Called after each completed instruction with the new PC.
    fn after_instruction(&mut self, pc: u16) {
        let _ = pc;
    }
}

/// Default device: ULA-style INT timing and nothing else.
#[derive(Debug, Default)]
pub struct NullDevices;

impl DeviceHooks for NullDevices {}
