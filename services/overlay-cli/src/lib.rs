//! Command-line front end for precipitation overlays.

pub mod cli;
pub mod commands;
pub mod logging;
