pub mod completions;
pub mod config;
pub mod emit;
pub mod replay;
pub mod run;
