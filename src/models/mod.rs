use serde::{Deserialize, Serialize};

/// Backend account info object.
///
/// The API returns this under the `account` field. We keep it flexible to
/// avoid breaking when backend fields evolve.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct AccountInfo {
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// A stored note as the remote API returns it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct Note {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// The two persisted fields of a note, as handed to and from a backend's
/// `load`. Absent values are represented as empty strings, never as nulls.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NoteDoc {
    pub name: String,
    pub content: String,
}
