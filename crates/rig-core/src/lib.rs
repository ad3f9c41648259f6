pub mod command;
mod command_proptest;
pub mod constants;
pub mod control_loop;
pub mod hal;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod measurement;
pub mod tags;
pub mod timebase;
pub mod timing;

pub use command::{CommandRejection, SpeedCommand, Unvalidated, Validated};
pub use constants::RigConstants;
pub use control_loop::{
    CommandOutcome, CycleObserver, ExecutionStats, LoopError, RecordStream, RigState, TestRig,
};
pub use hal::{Direction, HalError, PinLevel, PowerReading, RigIO};
#[cfg(feature = "simulation")]
pub use hal_sim::{SimParams, SimulatedRig};
pub use measurement::Measurement;
pub use timebase::TimeBase;
pub use timing::StepTiming;
