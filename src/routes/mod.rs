pub mod intake;
pub mod recipe;
