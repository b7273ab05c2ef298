//! CLI Commands

pub mod clean;
pub mod health;
pub mod report;
pub mod run;
