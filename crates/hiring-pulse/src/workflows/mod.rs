pub mod pulse;
pub mod sequences;
