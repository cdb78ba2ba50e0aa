use thiserror::Error;

/// Fatal startup failures.
///
/// Everything that can go wrong after the sockets are up is recovered
/// locally (logged and counted), never surfaced through this type.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("cannot resolve multicast group '{group}': {reason}")]
    Resolution { group: String, reason: String },

    #[error("socket setup failed at {stage}: {source}")]
    Socket {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SetupError>;
