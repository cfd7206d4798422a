use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;
pub const DEFAULT_MAX_ESTABLISHING_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchConfigError {
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// Per-connection dispatch limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Hard cap on the request line length, terminator included.
    pub max_line_bytes: usize,
    /// Cap on client bytes buffered while the downstream connection is
    /// being established.
    pub max_establishing_buffer_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            max_establishing_buffer_bytes: DEFAULT_MAX_ESTABLISHING_BUFFER_BYTES,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), DispatchConfigError> {
        if self.max_line_bytes == 0 {
            return Err(DispatchConfigError::ZeroValue("max_line_bytes"));
        }
        if self.max_establishing_buffer_bytes == 0 {
            return Err(DispatchConfigError::ZeroValue(
                "max_establishing_buffer_bytes",
            ));
        }
        Ok(())
    }
}
