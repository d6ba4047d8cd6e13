#![allow(unused)]

pub use genomic_data::common_io as io;

pub use clap::{ArgAction, Args, Parser, Subcommand};
pub use env_logger;

pub use log::{info, warn};
pub use std::path::Path;
