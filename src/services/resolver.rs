use crate::error::{EditError, TransferOp};
use crate::services::prompt::KeyPicker;
use crate::services::storage::ObjectStore;
use tracing::info;

/// Keys returned by one prefix listing, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    keys: Vec<String>,
}

impl CandidateSet {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys matching `input`, in listing order. An empty input matches everything.
    pub fn filter(&self, input: &str) -> Vec<&str> {
        self.keys
            .iter()
            .map(String::as_str)
            .filter(|key| matches_input(key, input))
            .collect()
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '/' | '-' | '_' | '.') || c.is_whitespace()
}

/// Case-insensitive: a key matches when it starts with `input`, or when the
/// rest of the key after any `/ - _ .` separator does.
fn matches_input(key: &str, input: &str) -> bool {
    let key = key.to_lowercase();
    let input = input.to_lowercase();
    key.starts_with(&input)
        || key
            .char_indices()
            .filter(|(_, c)| is_separator(*c))
            .any(|(i, c)| key[i + c.len_utf8()..].starts_with(&input))
}

/// Turns a prefix into exactly one key.
pub struct KeyResolver<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> KeyResolver<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Lists once, then picks: zero keys is `NotFound`, one key is returned
    /// directly, more go through `picker`. Nothing is written.
    pub async fn resolve(
        &self,
        prefix: &str,
        picker: &mut dyn KeyPicker,
    ) -> Result<String, EditError> {
        let container = self.store.container();
        let keys = self
            .store
            .list_keys(prefix)
            .await
            .map_err(|source| EditError::Transfer {
                op: TransferOp::List,
                container: container.to_string(),
                key: prefix.to_string(),
                source,
            })?;

        let mut candidates = CandidateSet::new(keys);
        info!(
            "🔎 {} object(s) in `{}` under prefix `{}`",
            candidates.len(),
            container,
            prefix
        );

        if candidates.is_empty() {
            return Err(EditError::NotFound {
                container: container.to_string(),
                prefix: prefix.to_string(),
            });
        }
        if candidates.len() == 1 {
            return Ok(candidates.keys.remove(0));
        }

        let selected = picker
            .pick(&candidates)
            .map_err(|e| EditError::io("read key selection from", "terminal", e))?;
        selected.ok_or(EditError::Cancelled)
    }
}
