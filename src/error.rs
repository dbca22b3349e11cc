//! Error types for the backup and pruning workflow.
//!
//! No `anyhow` leakage. Explicit, typed errors. Every wrapped failure names
//! the operation and the record it happened on, so a single message line is
//! enough to attribute it.

/// Which part of a run produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Input or configuration rejected before any provider call.
    Config,
    /// The create-image request failed.
    Create,
    /// An image or snapshot listing failed.
    List,
    /// A deregister or snapshot delete failed.
    Delete,
    /// A listed record could not be interpreted.
    Record,
    /// Raw backend failure not yet attributed to an operation.
    Provider,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("create image failed for instance {instance_id} with \"{cause}\"")]
    Create { instance_id: String, cause: String },

    #[error("describe images failed: {0}")]
    ListImages(String),

    #[error("describe snapshots failed: {0}")]
    ListSnapshots(String),

    #[error("deregister image failed for {name} ({id}) with \"{cause}\"")]
    Deregister {
        id: String,
        name: String,
        cause: String,
    },

    #[error("delete snapshot failed for {description} with \"{cause}\"")]
    DeleteSnapshot {
        id: String,
        description: String,
        cause: String,
    },

    /// The image is already gone when this is returned.
    #[error("snapshot cleanup failed for {name} ({id}) with \"{cause}\"")]
    Reap {
        id: String,
        name: String,
        cause: Box<BackupError>,
    },

    #[error("malformed creation date for {id} (\"{value}\"): {cause}")]
    MalformedRecord {
        id: String,
        value: String,
        cause: String,
    },

    #[error("provider request failed: {0}")]
    Provider(String),
}

impl BackupError {
    pub fn phase(&self) -> Phase {
        match self {
            BackupError::Config(_) => Phase::Config,
            BackupError::Create { .. } => Phase::Create,
            BackupError::ListImages(_) | BackupError::ListSnapshots(_) => Phase::List,
            BackupError::Deregister { .. }
            | BackupError::DeleteSnapshot { .. }
            | BackupError::Reap { .. } => Phase::Delete,
            BackupError::MalformedRecord { .. } => Phase::Record,
            BackupError::Provider(_) => Phase::Provider,
        }
    }

    /// Text to embed when wrapping this error under another operation.
    ///
    /// Raw provider failures contribute only their message, so a wrapped
    /// error reads `<operation> failed ... with "<cause>"` with no extra layer.
    pub fn cause_text(&self) -> String {
        match self {
            BackupError::Provider(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error comes out of the pruning pass, i.e. it can only
    /// happen after an image was successfully created.
    pub fn is_deletion_phase(&self) -> bool {
        matches!(
            self.phase(),
            Phase::List | Phase::Delete | Phase::Record
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackupError::Config("instance id is empty".to_string());
        assert_eq!(err.to_string(), "invalid configuration: instance id is empty");

        let err = BackupError::Create {
            instance_id: "i-0abc".to_string(),
            cause: "UnauthorizedOperation".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "create image failed for instance i-0abc with \"UnauthorizedOperation\""
        );

        let err = BackupError::ListImages("throttled".to_string());
        assert_eq!(err.to_string(), "describe images failed: throttled");

        let err = BackupError::ListSnapshots("throttled".to_string());
        assert_eq!(err.to_string(), "describe snapshots failed: throttled");

        let err = BackupError::Deregister {
            id: "ami-1".to_string(),
            name: "web.bak.20240101000000".to_string(),
            cause: "InvalidAMIID.Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "deregister image failed for web.bak.20240101000000 (ami-1) with \"InvalidAMIID.Unavailable\""
        );

        let err = BackupError::DeleteSnapshot {
            id: "snap-1".to_string(),
            description: "Created by CreateImage for ami-1".to_string(),
            cause: "InvalidSnapshot.InUse".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "delete snapshot failed for Created by CreateImage for ami-1 with \"InvalidSnapshot.InUse\""
        );

        let err = BackupError::MalformedRecord {
            id: "ami-1".to_string(),
            value: "yesterday".to_string(),
            cause: "input contains invalid characters".to_string(),
        };
        assert!(err.to_string().contains("ami-1"));
        assert!(err.to_string().contains("\"yesterday\""));
    }

    #[test]
    fn test_reap_error_keeps_cause() {
        let inner = BackupError::ListSnapshots("connection reset".to_string());
        let err = BackupError::Reap {
            id: "ami-1".to_string(),
            name: "web.bak.1".to_string(),
            cause: Box::new(inner),
        };
        assert_eq!(
            err.to_string(),
            "snapshot cleanup failed for web.bak.1 (ami-1) with \"describe snapshots failed: connection reset\""
        );

        // The cause is already in the message; a chain walk must not repeat it.
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_cause_text_unwraps_provider() {
        let raw = BackupError::Provider("RequestLimitExceeded".to_string());
        assert_eq!(raw.cause_text(), "RequestLimitExceeded");

        let wrapped = BackupError::ListSnapshots("connection reset".to_string());
        assert_eq!(
            wrapped.cause_text(),
            "describe snapshots failed: connection reset"
        );
    }

    #[test]
    fn test_error_phase() {
        assert_eq!(BackupError::Config("x".into()).phase(), Phase::Config);
        assert_eq!(
            BackupError::Create {
                instance_id: "i".into(),
                cause: "x".into()
            }
            .phase(),
            Phase::Create
        );
        assert_eq!(BackupError::ListImages("x".into()).phase(), Phase::List);
        assert_eq!(BackupError::Provider("x".into()).phase(), Phase::Provider);

        assert!(BackupError::ListImages("x".into()).is_deletion_phase());
        assert!(BackupError::ListSnapshots("x".into()).is_deletion_phase());
        assert!(BackupError::Deregister {
            id: "a".into(),
            name: "n".into(),
            cause: "x".into()
        }
        .is_deletion_phase());
        assert!(BackupError::MalformedRecord {
            id: "a".into(),
            value: "v".into(),
            cause: "x".into()
        }
        .is_deletion_phase());

        assert!(!BackupError::Config("x".into()).is_deletion_phase());
        assert!(!BackupError::Create {
            instance_id: "i".into(),
            cause: "x".into()
        }
        .is_deletion_phase());
        assert!(!BackupError::Provider("x".into()).is_deletion_phase());
    }
}
