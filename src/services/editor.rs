use crate::error::EditorError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Hands a staged file to the operator for editing.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Blocks until editing is over. Errors are informational: the file may
    /// still have been saved.
    async fn edit(&self, path: &Path) -> Result<(), EditorError>;
}

/// Runs `<command> <path>` attached to the operator's terminal.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Editor for CommandEditor {
    async fn edit(&self, path: &Path) -> Result<(), EditorError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or(EditorError::EmptyCommand)?;

        // stdin, stdout and stderr are inherited by `status()`
        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .await
            .map_err(|source| EditorError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(EditorError::Exited {
                command: self.command.clone(),
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_command() {
        let err = CommandEditor::new("   ")
            .edit(Path::new("/tmp/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = CommandEditor::new("s3edit-no-such-editor-binary")
            .edit(Path::new("/tmp/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();

        assert!(CommandEditor::new("true").edit(file.path()).await.is_ok());

        let err = CommandEditor::new("false")
            .edit(file.path())
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Exited { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arguments_precede_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.txt");
        std::fs::write(&path, b"").unwrap();

        // `cp <src> <path>` overwrites the staged file
        let source = dir.path().join("replacement.txt");
        std::fs::write(&source, b"replaced").unwrap();
        let editor = CommandEditor::new(format!("cp {}", source.display()));
        editor.edit(&path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"replaced");
    }
}
