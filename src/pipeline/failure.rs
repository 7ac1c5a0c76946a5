#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineFailureKind {
    ConfigurationMissing,
    Timeout,
    NetworkUnreachable,
    InvalidResponsePayload,
    ExhaustedRetries,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFailure {
    pub kind: PipelineFailureKind,
    pub message: String,
}

impl PipelineFailure {
    pub fn configuration_missing() -> Self {
        Self {
            kind: PipelineFailureKind::ConfigurationMissing,
            message: "webhook endpoint is not configured".to_string(),
        }
    }

    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self {
            kind: PipelineFailureKind::ConfigurationMissing,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: PipelineFailureKind::Timeout,
            message: "webhook attempt timed out".to_string(),
        }
    }

    pub fn network_unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: PipelineFailureKind::NetworkUnreachable,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: PipelineFailureKind::InvalidResponsePayload,
            message: message.into(),
        }
    }

    pub fn exhausted_retries(attempts: u32, last: Option<&PipelineFailure>) -> Self {
        let message = match last {
            Some(failure) => format!("{} attempts failed; last error: {}", attempts, failure.message),
            None => format!("{} attempts failed", attempts),
        };
        Self {
            kind: PipelineFailureKind::ExhaustedRetries,
            message,
        }
    }

    /// Fatal failures are never retried
    pub fn is_fatal(&self) -> bool {
        self.kind == PipelineFailureKind::ConfigurationMissing
    }

    /// Stable user-facing message for this failure class
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            PipelineFailureKind::ConfigurationMissing => {
                "The simulation service is not configured. Contact support."
            }
            PipelineFailureKind::Timeout => "The simulation took too long to respond.",
            PipelineFailureKind::NetworkUnreachable => "Could not reach the simulation service.",
            PipelineFailureKind::InvalidResponsePayload => {
                "The simulation service returned an unusable image."
            }
            PipelineFailureKind::ExhaustedRetries => {
                "The simulation failed. Please try again in a moment."
            }
        }
    }
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PipelineFailure {}
