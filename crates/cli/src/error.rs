use std::error::Error;

use pipeline::{ConfigError, PipelineError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// 2 configuration or input, 3 missing checkpoint cache, 4 analyzer
    /// contract violation, 1 anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Pipeline(PipelineError::Extraction { .. }) => 2,
            CliError::Pipeline(PipelineError::MissingCheckpoint { .. }) => 3,
            CliError::Pipeline(PipelineError::Analysis(_) | PipelineError::Contract { .. }) => 4,
            CliError::Other(_) => 1,
        }
    }

    pub fn class(&self) -> &'static str {
        match self.exit_code() {
            2 => "configuration error",
            3 => "missing checkpoint",
            4 => "contract violation",
            _ => "error",
        }
    }

    /// The message followed by every underlying cause.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !message.ends_with(&cause_text) {
                message.push_str(": ");
                message.push_str(&cause_text);
            }
            source = cause.source();
        }
        message
    }
}
