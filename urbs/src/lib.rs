//! urbs: command-line front end for urbs-classify.

pub mod classify;
pub mod cli;
pub mod config;
pub mod extract;
pub mod features;
pub mod info;
