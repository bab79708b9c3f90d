//! Process exit codes
//!
//! - 0: Success, no change, dry run or clean shutdown
//! - 1: Configuration or startup error
//! - 2: Publish failure or runtime error

use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GwddnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<GwddnsExitCode> for ExitCode {
    fn from(code: GwddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}
