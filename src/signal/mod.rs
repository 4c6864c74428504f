//! Signal-conditioning primitives shared by every task module.
//!
//! All three are fixed-capacity, allocation-free, and single-threaded:
//! they are driven from the cooperative main loop with a caller-supplied
//! monotonic timestamp, never from interrupt context.

pub mod median;
pub mod rate;
pub mod transient;

pub use median::MedianFilter;
pub use rate::Rate;
pub use transient::TransientEvent;
