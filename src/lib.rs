pub mod config;
pub mod error;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::EditConfig;
use crate::error::EditError;
use crate::services::editor::CommandEditor;
use crate::services::prompt::KeyPicker;
use crate::services::resolver::KeyResolver;
use crate::services::session::{EditSession, SessionOptions, SessionReport};
use crate::services::staging::StagingArea;
use crate::services::storage::ObjectStore;
use tokio_util::sync::CancellationToken;

/// Resolves `prefix` to one key and runs an edit session on it.
///
/// `cancel` aborts the listing and the download; once the editor has started
/// the session always runs to completion.
pub async fn edit_object(
    store: &dyn ObjectStore,
    config: &EditConfig,
    prefix: &str,
    picker: &mut dyn KeyPicker,
    cancel: CancellationToken,
) -> Result<SessionReport, EditError> {
    let resolver = KeyResolver::new(store);
    let key = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(EditError::Cancelled),
        key = resolver.resolve(prefix, picker) => key?,
    };

    let editor = CommandEditor::new(config.editor.clone());
    let mut staging = StagingArea::new(&config.staging_dir, config.suffix_len);

    let mut session = EditSession::new(store, &editor, &mut staging)
        .with_options(SessionOptions {
            conditional_upload: config.conditional_upload,
        })
        .with_cancellation(cancel);
    session.run(key).await
}
