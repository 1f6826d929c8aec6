//! Command-line interface module.

mod args;
pub mod common;
pub mod generate;
pub mod inspect;
pub mod session;
pub mod sync;

pub use args::{Cli, Commands, EngineArgs, ExportArgs, HostArgs, ParamArgs, SyncArgs};
