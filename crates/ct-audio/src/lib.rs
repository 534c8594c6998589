//! Audio output backends for chiptrack.

mod cpal_backend;
mod memory;
mod traits;

pub use cpal_backend::CpalOutput;
pub use memory::MemoryOutput;
pub use traits::{AudioError, AudioOutput};
