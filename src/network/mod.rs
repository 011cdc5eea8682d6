//! Network Module
//!
//! TCP session with the controller, plus a simulated controller.
//!
//! ## Architecture
//! - `MobileRackingSession`: one connection, one outstanding request
//! - `Simulator`: accept loop with a thread per connection

mod session;
mod simulator;

pub use session::{MobileRackingSession, SessionState};
pub use simulator::{Behavior, Simulator, SimulatorHandle};
