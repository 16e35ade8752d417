pub mod config;
pub mod models;
pub mod services;
pub mod startup;

#[cfg(test)]
mod test_support;

pub use startup::{ReleaseOutcome, ReleaseTask};
