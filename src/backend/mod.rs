//! The persistence backend the autosave engine writes through.
//!
//! A backend is a plain save/load pair: the engine never knows whether a
//! field lands in localStorage or behind the authenticated API. The active
//! backend is carried in a [`BackendBinding`] whose generation number goes
//! up on every swap, so a completion from a write dispatched against an old
//! binding can be recognized and ignored.

use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::models::NoteDoc;
use crate::storage::{
    load_local_note_field, local_storage, LOCAL_NOTE_CONTENT_KEY, LOCAL_NOTE_NAME_KEY,
};
use crate::sync::NoteField;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SyncErrorKind {
    Network,
    Storage,
    Unauthorized,
    NotFound,
    Http,
}

/// A backend refused or failed a write. The affected field stays dirty.
#[derive(Clone, Debug)]
pub(crate) struct SaveError {
    pub kind: SyncErrorKind,
    pub message: String,
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The initial fetch failed. Fatal to the view that requested it.
#[derive(Clone, Debug)]
pub(crate) struct LoadError {
    pub kind: SyncErrorKind,
    pub message: String,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn sync_kind(kind: &ApiErrorKind) -> SyncErrorKind {
    match kind {
        ApiErrorKind::Network => SyncErrorKind::Network,
        ApiErrorKind::Unauthorized => SyncErrorKind::Unauthorized,
        ApiErrorKind::NotFound => SyncErrorKind::NotFound,
        ApiErrorKind::Http | ApiErrorKind::Parse => SyncErrorKind::Http,
    }
}

impl From<ApiError> for SaveError {
    fn from(e: ApiError) -> Self {
        Self {
            kind: sync_kind(&e.kind),
            message: e.message,
        }
    }
}

impl From<ApiError> for LoadError {
    fn from(e: ApiError) -> Self {
        Self {
            kind: sync_kind(&e.kind),
            message: e.message,
        }
    }
}

/// Anonymous backend: two plain string entries in localStorage.
#[derive(Clone, Debug, Default)]
pub(crate) struct LocalNoteBackend;

impl LocalNoteBackend {
    fn key(field: NoteField) -> &'static str {
        match field {
            NoteField::Name => LOCAL_NOTE_NAME_KEY,
            NoteField::Content => LOCAL_NOTE_CONTENT_KEY,
        }
    }

    fn save(&self, field: NoteField, value: &str) -> Result<(), SaveError> {
        let storage = local_storage().ok_or_else(|| SaveError {
            kind: SyncErrorKind::Storage,
            message: "localStorage unavailable".to_string(),
        })?;

        // set_item fails on quota exhaustion or denied storage access.
        storage.set_item(Self::key(field), value).map_err(|_| SaveError {
            kind: SyncErrorKind::Storage,
            message: "localStorage write failed".to_string(),
        })
    }

    fn load(&self) -> NoteDoc {
        NoteDoc {
            name: load_local_note_field(LOCAL_NOTE_NAME_KEY),
            content: load_local_note_field(LOCAL_NOTE_CONTENT_KEY),
        }
    }
}

/// Authenticated backend: a remote note addressed by id.
#[derive(Clone)]
pub(crate) struct RemoteNoteBackend {
    pub api: ApiClient,
    pub note_id: String,
}

/// Rejects every request and counts the attempts; lets tests drive the
/// scheduler through the failure path end to end.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub(crate) struct FailingNoteBackend {
    pub attempts: std::sync::Arc<std::sync::atomic::AtomicU32>,
}

#[cfg(test)]
impl FailingNoteBackend {
    fn refuse(&self) -> SaveError {
        self.attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        SaveError {
            kind: SyncErrorKind::Network,
            message: "connection refused".to_string(),
        }
    }
}

/// The save/load pair currently wired to the engine.
#[derive(Clone)]
pub(crate) enum NoteBackend {
    Local(LocalNoteBackend),
    Remote(RemoteNoteBackend),
    #[cfg(test)]
    Failing(FailingNoteBackend),
}

impl NoteBackend {
    pub fn local() -> Self {
        Self::Local(LocalNoteBackend)
    }

    pub fn remote(api: ApiClient, note_id: String) -> Self {
        Self::Remote(RemoteNoteBackend { api, note_id })
    }

    pub async fn save(&self, field: NoteField, value: &str) -> Result<(), SaveError> {
        match self {
            Self::Local(b) => b.save(field, value),
            Self::Remote(b) => {
                b.api
                    .save_note_field(&b.note_id, field, value)
                    .await
                    .map_err(SaveError::from)?;
                Ok(())
            }
            #[cfg(test)]
            Self::Failing(b) => Err(b.refuse()),
        }
    }

    pub async fn load(&self) -> Result<NoteDoc, LoadError> {
        match self {
            Self::Local(b) => Ok(b.load()),
            Self::Remote(b) => Ok(b.api.load_note(&b.note_id).await?),
            #[cfg(test)]
            Self::Failing(b) => {
                let e = b.refuse();
                Err(LoadError {
                    kind: e.kind,
                    message: e.message,
                })
            }
        }
    }
}

/// Versioned reference to the active backend.
///
/// A write dispatched under generation N checks the live generation before
/// touching the store's dirty flags; swapping backends bumps the generation,
/// which orphans every in-flight completion from the previous binding.
#[derive(Clone)]
pub(crate) struct BackendBinding {
    pub generation: u64,
    pub backend: NoteBackend,
}

impl BackendBinding {
    pub fn new(backend: NoteBackend) -> Self {
        Self {
            generation: 0,
            backend,
        }
    }

    pub fn swap(&mut self, backend: NoteBackend) {
        self.generation += 1;
        self.backend = backend;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_swap_bumps_generation() {
        let mut b = BackendBinding::new(NoteBackend::local());
        assert_eq!(b.generation, 0);
        b.swap(NoteBackend::local());
        b.swap(NoteBackend::local());
        assert_eq!(b.generation, 2);
    }

    #[test]
    fn failing_backend_counts_refused_attempts() {
        let b = FailingNoteBackend::default();
        let backend = NoteBackend::Failing(b.clone());
        assert!(matches!(backend, NoteBackend::Failing(_)));

        let e = b.refuse();
        assert_eq!(e.kind, SyncErrorKind::Network);
        assert_eq!(b.attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn api_error_kinds_map_onto_sync_kinds() {
        assert_eq!(sync_kind(&ApiErrorKind::Network), SyncErrorKind::Network);
        assert_eq!(
            sync_kind(&ApiErrorKind::Unauthorized),
            SyncErrorKind::Unauthorized
        );
        assert_eq!(sync_kind(&ApiErrorKind::NotFound), SyncErrorKind::NotFound);
        assert_eq!(sync_kind(&ApiErrorKind::Parse), SyncErrorKind::Http);
    }
}
