use crate::models::AccountInfo;
use serde::{Deserialize, Serialize};

pub(crate) const TOKEN_KEY: &str = "mnote_token";
pub(crate) const USER_KEY: &str = "mnote_user";

/// Anonymous note fields live under a fixed namespace prefix, one plain
/// string entry per field.
pub(crate) const LOCAL_NOTE_NAME_KEY: &str = "__mnote_unauth_file_name";
pub(crate) const LOCAL_NOTE_CONTENT_KEY: &str = "__mnote_unauth_file_content";

pub(crate) fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn save_user_to_storage(user: &AccountInfo) {
    save_json_to_storage(USER_KEY, user);
}

pub(crate) fn load_user_from_storage() -> Option<AccountInfo> {
    load_json_from_storage(USER_KEY)
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let storage = local_storage()?;
    let json = storage.get_item(key).ok().flatten()?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        if let Some(storage) = local_storage() {
            let _ = storage.set_item(key, &json);
        }
    }
}

/// Read one anonymous note field. Absent keys read back as the empty
/// string, never as a missing value.
pub(crate) fn load_local_note_field(key: &str) -> String {
    local_storage()
        .and_then(|s| s.get_item(key).ok().flatten())
        .unwrap_or_default()
}

pub(crate) fn clear_local_note() {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(LOCAL_NOTE_NAME_KEY);
        let _ = storage.remove_item(LOCAL_NOTE_CONTENT_KEY);
    }
}
