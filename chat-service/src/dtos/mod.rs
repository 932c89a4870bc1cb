pub mod ai;
pub mod records;

pub use ai::*;
pub use records::*;
