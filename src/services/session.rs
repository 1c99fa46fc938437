use crate::error::{EditError, EditorError, TransferOp};
use crate::services::editor::Editor;
use crate::services::staging::{StagedFile, StagingArea};
use crate::services::storage::{ObjectStore, ObjectVersion, PreconditionFailed};
use crate::utils::hash::Fingerprint;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A remote object: container plus the key selected for this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub container: String,
    pub key: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    KeyResolved,
    Downloaded,
    PreHashed,
    Edited,
    PostHashed,
    Uploaded,
    Skipped,
    Failed,
    CleanedUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Content changed and was written back.
    Uploaded,
    /// Content unchanged; nothing was written.
    Skipped,
}

#[derive(Debug)]
pub struct SessionReport {
    pub object: ObjectRef,
    pub outcome: SessionOutcome,
    pub before: Fingerprint,
    pub after: Fingerprint,
    /// Set when the editor failed but the session carried on.
    pub editor_error: Option<EditorError>,
    /// Every state the session passed through, ending in `CleanedUp`.
    pub states: Vec<SessionState>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Send the ETag seen at download as an If-Match precondition on upload.
    pub conditional_upload: bool,
}

/// Runs download → edit → compare → conditional upload for one key.
pub struct EditSession<'a> {
    store: &'a dyn ObjectStore,
    editor: &'a dyn Editor,
    staging: &'a mut StagingArea,
    options: SessionOptions,
    cancel: CancellationToken,
    states: Vec<SessionState>,
}

struct Edited {
    outcome: SessionOutcome,
    before: Fingerprint,
    after: Fingerprint,
    editor_error: Option<EditorError>,
}

impl<'a> EditSession<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        editor: &'a dyn Editor,
        staging: &'a mut StagingArea,
    ) -> Self {
        Self {
            store,
            editor,
            staging,
            options: SessionOptions::default(),
            cancel: CancellationToken::new(),
            states: vec![SessionState::Idle],
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Token observed while the object is downloading.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// States entered so far, including the terminal ones of a failed run.
    pub fn states(&self) -> &[SessionState] {
        &self.states
    }

    fn enter(&mut self, state: SessionState) {
        debug!(?state, "session transition");
        self.states.push(state);
    }

    /// Edits `key`. The staged file never outlives this call: it is removed,
    /// or moved to a recovery file when an edit could not be written back.
    pub async fn run(&mut self, key: String) -> Result<SessionReport, EditError> {
        let object = ObjectRef {
            container: self.store.container().to_string(),
            key,
        };
        self.enter(SessionState::KeyResolved);

        let staged = self
            .staging
            .allocate()
            .map_err(|e| EditError::io("create staging file in", self.staging.dir(), e))?;

        let result = self.edit_staged(&object, &staged).await;
        self.enter(match &result {
            Ok(edited) if edited.outcome == SessionOutcome::Uploaded => SessionState::Uploaded,
            Ok(_) => SessionState::Skipped,
            Err(_) => SessionState::Failed,
        });

        let result = match result {
            Ok(edited) => {
                self.discard(staged);
                Ok(edited)
            }
            Err(EditError::Upload {
                container,
                key,
                source,
                ..
            }) => Err(EditError::Upload {
                recovered: Some(self.recover(staged, &key)),
                container,
                key,
                source,
            }),
            Err(EditError::Conflict { container, key, .. }) => Err(EditError::Conflict {
                recovered: Some(self.recover(staged, &key)),
                container,
                key,
            }),
            Err(e) => {
                self.discard(staged);
                Err(e)
            }
        };
        self.enter(SessionState::CleanedUp);
        debug!(states = ?self.states, "session finished");

        let edited = result?;
        Ok(SessionReport {
            object,
            outcome: edited.outcome,
            before: edited.before,
            after: edited.after,
            editor_error: edited.editor_error,
            states: self.states.clone(),
        })
    }

    async fn edit_staged(
        &mut self,
        object: &ObjectRef,
        staged: &StagedFile,
    ) -> Result<Edited, EditError> {
        let path = staged.path();

        let version = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Download of {} cancelled", object);
                return Err(EditError::Cancelled);
            }
            res = self.store.download(&object.key, path) => res.map_err(|source| EditError::Transfer {
                op: TransferOp::Download,
                container: object.container.clone(),
                key: object.key.clone(),
                source,
            })?,
        };
        info!("⬇️  Downloaded {:?} to {:?} ({} bytes)", object.key, path, version.size);
        self.enter(SessionState::Downloaded);

        let before = Fingerprint::of_file(path)
            .await
            .map_err(|e| EditError::io("fingerprint", path, e))?;
        self.enter(SessionState::PreHashed);

        let editor_error = match self.editor.edit(path).await {
            Ok(()) => {
                info!("✏️  Successfully edited.");
                None
            }
            Err(e) => {
                warn!("Error while editing: {}", e);
                Some(e)
            }
        };
        self.enter(SessionState::Edited);

        let after = Fingerprint::of_file(path)
            .await
            .map_err(|e| EditError::io("fingerprint", path, e))?;
        self.enter(SessionState::PostHashed);

        if before == after {
            info!("No changes made");
            return Ok(Edited {
                outcome: SessionOutcome::Skipped,
                before,
                after,
                editor_error,
            });
        }

        debug!(%before, %after, "content changed");
        self.upload(object, staged, &version).await?;
        info!(
            "⬆️  Successfully uploaded {:?} to {:?}",
            object.key, object.container
        );

        Ok(Edited {
            outcome: SessionOutcome::Uploaded,
            before,
            after,
            editor_error,
        })
    }

    async fn upload(
        &self,
        object: &ObjectRef,
        staged: &StagedFile,
        version: &ObjectVersion,
    ) -> Result<(), EditError> {
        let if_match = if self.options.conditional_upload {
            if version.etag.is_none() {
                warn!("Store returned no ETag for {}, uploading unconditionally", object);
            }
            version.etag.as_deref()
        } else {
            None
        };

        self.store
            .upload(&object.key, staged.path(), if_match)
            .await
            .map_err(|source| {
                if source.downcast_ref::<PreconditionFailed>().is_some() {
                    EditError::Conflict {
                        container: object.container.clone(),
                        key: object.key.clone(),
                        recovered: None,
                    }
                } else {
                    EditError::Upload {
                        container: object.container.clone(),
                        key: object.key.clone(),
                        recovered: None,
                        source,
                    }
                }
            })
    }

    fn discard(&self, staged: StagedFile) {
        info!("🧹 Deleting {:?}", staged.path());
        let path = staged.path().to_path_buf();
        if let Err(e) = staged.remove() {
            error!("Failed to delete staged file {}: {}", path.display(), e);
        }
    }

    /// Moves an edit that could not be written back out of the staged path.
    /// Falls back to leaving the staged file in place.
    fn recover(&self, staged: StagedFile, key: &str) -> std::path::PathBuf {
        match staged.preserve(key) {
            Ok(recovered) => {
                warn!("💾 Edit of {:?} kept at {:?}", key, recovered);
                recovered
            }
            Err((staged, e)) => {
                error!(
                    "Failed to move staged file {}: {}; leaving it in place",
                    staged.path().display(),
                    e
                );
                staged.keep()
            }
        }
    }
}
