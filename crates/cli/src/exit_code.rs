// Consistent exit codes for the folio CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = server not configured
//   11 = authentication error
//   12 = rejected by the server or by a local tree check
//   13 = network error

use std::process;

use folio_engine::config::ConfigError;
use folio_engine::gateway::GatewayError;
use folio_engine::sidebar::SidebarError;

use crate::client::LookupError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotConfigured = 10,
    Auth = 11,
    Conflict = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(sidebar) = cause.downcast_ref::<SidebarError>() {
                return match sidebar {
                    SidebarError::Gateway { source, .. } => Self::from_gateway(source),
                    SidebarError::NotVisible(_) => Self::Usage,
                    SidebarError::Drop(_) | SidebarError::Tree(_) => Self::Conflict,
                };
            }
            if let Some(gateway) = cause.downcast_ref::<GatewayError>() {
                return Self::from_gateway(gateway);
            }
            if let Some(config) = cause.downcast_ref::<ConfigError>() {
                return match config {
                    ConfigError::Missing(_) | ConfigError::Invalid(_) => Self::NotConfigured,
                    _ => Self::Error,
                };
            }
            if cause.downcast_ref::<LookupError>().is_some() {
                return Self::Usage;
            }
        }
        Self::Error
    }

    pub fn from_gateway(err: &GatewayError) -> Self {
        match err {
            GatewayError::Transient(_) => Self::Network,
            GatewayError::Rejected { status: 401 | 403, .. } => Self::Auth,
            GatewayError::Rejected { status: 404, .. } => Self::Usage,
            GatewayError::Rejected { .. } => Self::Conflict,
            GatewayError::Decode(_) => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
