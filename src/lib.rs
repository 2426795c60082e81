pub mod cli;
pub mod errors;
pub mod executor;
pub mod model;
pub mod output;
pub mod platform;
pub mod progress;
pub mod scanner;
pub mod stats;
pub mod writer;
