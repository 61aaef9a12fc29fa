pub mod assemble;
pub mod check;
pub mod config;
pub mod plan;
pub mod probe;
pub mod sync;
