pub mod inference;
pub mod renderer;
pub mod storage;
pub mod submission;
