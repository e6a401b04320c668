pub mod event;
pub mod memory;

pub use event::{Event, NewEvent};
pub use memory::{Memory, MemoryFields};
