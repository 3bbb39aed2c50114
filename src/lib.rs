pub mod alignment;
pub mod annotation;
pub mod categories;
pub mod config;
pub mod errors;
pub mod hyphy;
pub mod orthologs;
pub mod pipeline;
pub mod priority;
pub mod qc;
pub mod seq;
mod runner;

use crate::errors::CanidError;

pub fn run() -> Result<(), CanidError> {
    runner::run()
}
