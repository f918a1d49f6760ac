//! Pipeline entry points for synchronization.
//!
//! - `ThreadSession`: incremental polling of one board thread
//! - `SyncDriver`: runs the board session and the live chat together

mod session;
mod sync;

pub use session::ThreadSession;
pub use sync::{SyncDriver, SyncEvent};
