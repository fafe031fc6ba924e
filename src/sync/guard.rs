use crate::sync::store::FieldStore;
use leptos::ev;
use leptos::prelude::*;

/// Ask the browser to confirm navigation while any field is dirty.
///
/// The dirty flags are read at unload time, so the guard always reflects the
/// store's live state. Best-effort only: the host environment owns the final
/// decision on whether the dialog is shown.
pub(crate) fn use_unsaved_changes_guard(store: FieldStore) {
    let handle = window_event_listener(ev::beforeunload, move |ev: web_sys::BeforeUnloadEvent| {
        if store.any_dirty_untracked() {
            ev.prevent_default();
            // Legacy engines require a non-null return value as well.
            ev.set_return_value("");
        }
    });

    on_cleanup(move || handle.remove());
}
