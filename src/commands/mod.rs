pub mod fix;

pub use fix::FixCommand;
