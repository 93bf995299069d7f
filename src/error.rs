use std::path::PathBuf;

/// Failures talking to the game server's remote-control port.
#[derive(Debug, thiserror::Error)]
pub enum RconError {
    #[error("rcon io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rcon authentication rejected by {address}")]
    AuthRejected { address: String },

    #[error("malformed rcon packet: {reason}")]
    MalformedPacket { reason: String },
}

/// Failures reading or writing the persisted player records.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings '{}': {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid settings: {reason}")]
    Invalid { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LogTailError {
    #[error("log io error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("no server log found in '{}' after waiting {waited_seconds}s", directory.display())]
    NoLogFile {
        directory: PathBuf,
        waited_seconds: u64,
    },
}

/// Start-up and loop failures that end `run()`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    LogTail(#[from] LogTailError),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let error = RconError::AuthRejected {
            address: "127.0.0.1:27015".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "rcon authentication rejected by 127.0.0.1:27015"
        );

        let error = LogTailError::NoLogFile {
            directory: PathBuf::from("logs"),
            waited_seconds: 30,
        };
        assert_eq!(
            error.to_string(),
            "no server log found in 'logs' after waiting 30s"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
        assert_send_sync::<RconError>();
    }
}
