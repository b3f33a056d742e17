use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid notification ID")]
    InvalidNotificationId,

    #[error("invalid recipient")]
    InvalidRecipient,

    #[error("missing message content")]
    MissingContent,

    #[error("invalid template")]
    InvalidTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("invalid email address: {0}")]
    InvalidEmailAddress(String),

    #[error("invalid email subject")]
    InvalidSubject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("remote rejected message (code {code}): {message}")]
    RemoteRejected { code: i64, message: String },

    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl SendError {
    /// Network and timeout failures may succeed if the message is sent again.
    /// Nothing in the pipeline retries; this only feeds logging.
    pub fn is_transient(&self) -> bool {
        matches!(self, SendError::Network(_) | SendError::Timeout(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("failed to encode acknowledgment: {0}")]
    Serialization(String),

    #[error("failed to publish acknowledgment: {0}")]
    Publish(String),

    #[error("acknowledgment publish timed out after {0} ms")]
    Timeout(u128),
}

/// Failure of one pass through validate, compose and send. The `Display`
/// form becomes the `details` of the FAILURE acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to build message: {0}")]
    Compose(#[from] ComposeError),

    #[error("failed to send message: {0}")]
    Send(#[from] SendError),
}

/// Raised by the consumer loop when a failure could not be reported
/// downstream because the acknowledgment itself was lost.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("notification {notification_id} failed ({details}), acknowledgment lost: {source}")]
    AckNotPublished {
        notification_id: String,
        details: String,
        #[source]
        source: EmitError,
    },
}
