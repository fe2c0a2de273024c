pub mod config;
pub mod conflicts;
pub mod constraints;
pub mod evaluation;
pub mod output;
pub mod schedule;
pub mod scoring;
