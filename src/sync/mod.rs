//! Autosave synchronization engine.
//!
//! Turns keystroke-level edits into a bounded rate of durable writes:
//! - the field store holds each tracked field's value and dirty/in-flight
//!   flags and is the single source of truth for the view layer.
//! - [`NoteSyncController`] runs one debounced scheduler per field and
//!   writes through the injected, versioned backend binding.
//! - [`use_unsaved_changes_guard`] blocks page unload while edits are
//!   unconfirmed.

mod debounce;
mod guard;
mod store;

pub(crate) use guard::use_unsaved_changes_guard;
pub(crate) use store::NoteSyncController;

use crate::api::{ApiClient, ApiResult};
use crate::models::Note;
use crate::storage::{
    clear_local_note, load_local_note_field, LOCAL_NOTE_CONTENT_KEY, LOCAL_NOTE_NAME_KEY,
};

/// One of the two persisted note fields.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum NoteField {
    Name,
    Content,
}

impl NoteField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Content => "content",
        }
    }
}

/// First sign-in migrates the anonymous note into the account.
///
/// If the anonymous localStorage note has any text, create it as a remote
/// note and clear the anonymous keys; further writes in this session route
/// to the authenticated backend only. An empty anonymous note migrates
/// nothing.
pub(crate) async fn migrate_anonymous_note(api: &ApiClient) -> ApiResult<Option<Note>> {
    let name = load_local_note_field(LOCAL_NOTE_NAME_KEY);
    let content = load_local_note_field(LOCAL_NOTE_CONTENT_KEY);

    if name.trim().is_empty() && content.trim().is_empty() {
        return Ok(None);
    }

    let effective_name = if name.trim().is_empty() {
        "Untitled"
    } else {
        name.trim()
    };

    let note = api.create_note(effective_name, &content).await?;

    // Only clear anonymous storage once the remote copy is confirmed.
    clear_local_note();

    Ok(Some(note))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_the_backend_contract() {
        assert_eq!(NoteField::Name.as_str(), "name");
        assert_eq!(NoteField::Content.as_str(), "content");
    }
}
