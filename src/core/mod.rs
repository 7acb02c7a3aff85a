pub mod interrupt;
pub mod session;

pub use interrupt::StopSignal;
pub use session::{run_session, FrameSink};
