use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Remote operation that failed, used for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    List,
    Download,
    Upload,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferOp::List => "list",
            TransferOp::Download => "download",
            TransferOp::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("No object in `{container}` matches prefix `{prefix}`")]
    NotFound { container: String, prefix: String },

    #[error("Cancelled by operator")]
    Cancelled,

    #[error("Unable to {op} `{}`: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to {op} `{key}` in `{container}`: {source:#}")]
    Transfer {
        op: TransferOp,
        container: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to upload `{key}` to `{container}`: {source:#}{}", recovered_note(recovered))]
    Upload {
        container: String,
        key: String,
        recovered: Option<PathBuf>,
        #[source]
        source: anyhow::Error,
    },

    #[error("`{key}` in `{container}` changed since it was downloaded{}", recovered_note(recovered))]
    Conflict {
        container: String,
        key: String,
        recovered: Option<PathBuf>,
    },
}

impl EditError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EditError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Local copy of an edit that could not be written back, if one was kept.
    pub fn recovered_path(&self) -> Option<&PathBuf> {
        match self {
            EditError::Upload { recovered, .. } | EditError::Conflict { recovered, .. } => {
                recovered.as_ref()
            }
            _ => None,
        }
    }
}

fn recovered_note(recovered: &Option<PathBuf>) -> String {
    match recovered {
        Some(path) => format!(" (edit kept at `{}`)", path.display()),
        None => String::new(),
    }
}

/// Failure of the external editor. Reported, never fatal to a session.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Editor command is empty")]
    EmptyCommand,

    #[error("Failed to launch editor `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Editor `{command}` exited with {}", exit_code_note(*code))]
    Exited { command: String, code: Option<i32> },
}

fn exit_code_note(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = EditError::Transfer {
            op: TransferOp::Download,
            container: "docs".to_string(),
            key: "readme.md".to_string(),
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(
            err.to_string(),
            "Unable to download `readme.md` in `docs`: connection reset"
        );

        let err = EditError::NotFound {
            container: "docs".to_string(),
            prefix: "zzz".to_string(),
        };
        assert_eq!(err.to_string(), "No object in `docs` matches prefix `zzz`");
    }

    #[test]
    fn test_recovered_path_is_reported() {
        let err = EditError::Conflict {
            container: "docs".to_string(),
            key: "readme.md".to_string(),
            recovered: Some(PathBuf::from("/tmp/s3edit-recovered-readme.md-abc")),
        };
        assert!(err.to_string().contains("/tmp/s3edit-recovered-readme.md-abc"));
        assert!(err.recovered_path().is_some());
        assert!(EditError::Cancelled.recovered_path().is_none());
    }

    #[test]
    fn test_editor_exit_message() {
        let err = EditorError::Exited {
            command: "vim".to_string(),
            code: Some(1),
        };
        assert_eq!(err.to_string(), "Editor `vim` exited with status 1");
    }
}
