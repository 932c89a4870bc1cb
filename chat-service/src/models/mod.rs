pub mod chat;
pub mod usage;

pub use chat::{ChatTurn, Part, Role};
pub use usage::Usage;
