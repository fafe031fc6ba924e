mod api;
mod app;
mod backend;
mod components;
mod markdown;
mod models;
mod pages;
mod state;
mod storage;
mod sync;
mod util;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` +
// wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::api::ApiClient;
    use crate::backend::{FailingNoteBackend, NoteBackend};
    use crate::models::AccountInfo;
    use std::sync::atomic::Ordering;
    use crate::storage::{
        clear_local_note, load_local_note_field, load_user_from_storage, save_user_to_storage,
        LOCAL_NOTE_CONTENT_KEY, LOCAL_NOTE_NAME_KEY,
    };
    use crate::sync::{NoteField, NoteSyncController};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    async fn sleep_ms(ms: i32) {
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            let win = web_sys::window().expect("window");
            let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        });
        let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
    }

    #[wasm_bindgen_test]
    fn api_client_storage_roundtrip_token() {
        ApiClient::clear_storage();

        let mut c = ApiClient::load_from_storage();
        assert!(!c.is_authenticated());

        c.set_token("t1".to_string());
        c.save_to_storage();

        let c2 = ApiClient::load_from_storage();
        assert_eq!(c2.get_auth_token().as_deref(), Some("t1"));

        ApiClient::clear_storage();
        let c3 = ApiClient::load_from_storage();
        assert!(c3.get_auth_token().is_none());
    }

    #[wasm_bindgen_test]
    fn user_storage_roundtrip() {
        let user = AccountInfo {
            extra: serde_json::json!({"id": 1, "username": "u"}),
        };
        save_user_to_storage(&user);
        let loaded = load_user_from_storage().expect("should load user from localStorage");
        assert_eq!(loaded.extra["username"], "u");
    }

    #[wasm_bindgen_test]
    async fn local_backend_save_and_load() {
        clear_local_note();

        let backend = NoteBackend::local();
        backend
            .save(NoteField::Name, "groceries")
            .await
            .expect("local save should succeed");
        backend
            .save(NoteField::Content, "- milk")
            .await
            .expect("local save should succeed");

        let doc = backend.load().await.expect("local load never fails");
        assert_eq!(doc.name, "groceries");
        assert_eq!(doc.content, "- milk");

        clear_local_note();
        // Absent keys read back as empty strings, not as missing values.
        let doc = backend.load().await.expect("local load never fails");
        assert_eq!(doc.name, "");
        assert_eq!(doc.content, "");
        assert_eq!(load_local_note_field(LOCAL_NOTE_NAME_KEY), "");
        assert_eq!(load_local_note_field(LOCAL_NOTE_CONTENT_KEY), "");
    }

    #[wasm_bindgen_test]
    async fn autosave_coalesces_rapid_edits_into_one_write() {
        clear_local_note();

        let c = NoteSyncController::new(NoteBackend::local());
        c.set(NoteField::Content, "a");
        c.set(NoteField::Content, "ab");
        assert!(c.store.dirty(NoteField::Content).get_untracked());

        // Nothing persisted inside the quiet period.
        assert_eq!(load_local_note_field(LOCAL_NOTE_CONTENT_KEY), "");

        // Well past the content quiet period: only the final value landed.
        sleep_ms(1800).await;
        assert_eq!(load_local_note_field(LOCAL_NOTE_CONTENT_KEY), "ab");
        assert!(!c.store.dirty(NoteField::Content).get_untracked());
        assert!(!c.store.saving(NoteField::Content).get_untracked());

        clear_local_note();
    }

    #[wasm_bindgen_test]
    async fn backend_swap_flushes_pending_before_rebinding() {
        clear_local_note();

        let c = NoteSyncController::new(NoteBackend::local());
        c.set(NoteField::Content, "pending");

        // The swap writes the pending value through the outgoing backend
        // before the generation moves on.
        c.swap_backend(NoteBackend::local());
        sleep_ms(50).await;
        assert_eq!(load_local_note_field(LOCAL_NOTE_CONTENT_KEY), "pending");

        // The orphaned completion still clears the in-flight flag but leaves
        // dirty set: the new binding has not confirmed this value.
        assert!(!c.store.saving(NoteField::Content).get_untracked());
        assert!(c.store.dirty(NoteField::Content).get_untracked());

        clear_local_note();
    }

    #[wasm_bindgen_test]
    async fn failed_save_surfaces_error_and_retries_on_next_edit() {
        let backend = FailingNoteBackend::default();
        let attempts = backend.attempts.clone();
        let c = NoteSyncController::new(NoteBackend::Failing(backend));

        c.set(NoteField::Content, "draft");
        sleep_ms(1600).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(c.store.dirty(NoteField::Content).get_untracked());
        assert!(!c.store.saving(NoteField::Content).get_untracked());
        let msg = c
            .store
            .save_error
            .get_untracked()
            .expect("failure is surfaced");
        assert!(msg.contains("content"));

        // No timed retry: the engine stays quiet until the next edit.
        sleep_ms(1600).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // The next edit's debounce cycle is the retry.
        c.set(NoteField::Content, "draft 2");
        sleep_ms(1600).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(c.store.dirty(NoteField::Content).get_untracked());
    }

    #[wasm_bindgen_test]
    async fn flush_writes_pending_value_immediately() {
        clear_local_note();

        let c = NoteSyncController::new(NoteBackend::local());
        c.set(NoteField::Name, "n1");
        c.set(NoteField::Name, "n2");
        c.flush_all();

        // The flush dispatches straight away; give the async completion a tick.
        sleep_ms(50).await;
        assert_eq!(load_local_note_field(LOCAL_NOTE_NAME_KEY), "n2");
        assert!(!c.store.dirty(NoteField::Name).get_untracked());

        // The cancelled timer must not fire a second write.
        c.set(NoteField::Content, "body");
        c.flush_all();
        sleep_ms(1600).await;
        assert_eq!(load_local_note_field(LOCAL_NOTE_NAME_KEY), "n2");
        assert_eq!(load_local_note_field(LOCAL_NOTE_CONTENT_KEY), "body");

        clear_local_note();
    }
}
