/// Relay client for bundle submission
pub mod relay;
pub use relay::{Flashbots, RelayError};

mod task;
pub use task::SubmitTask;
