use crate::backend::{BackendBinding, LoadError, NoteBackend, SyncErrorKind};
use crate::models::NoteDoc;
use crate::sync::debounce::DebounceState;
use crate::sync::NoteField;
use crate::util::now_ms;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::{Arc, Mutex};
use wasm_bindgen::JsCast;

/// Idle time after the last name edit before a write is attempted. The name
/// is short and edited rarely, so it gets the snappier period.
pub(crate) const NAME_QUIET_MS: i64 = 1000;

/// Idle time after the last content edit. Slightly longer than the name:
/// body text arrives in bursts and a longer window coalesces more of them.
pub(crate) const CONTENT_QUIET_MS: i64 = 1200;

#[derive(Clone, Copy)]
struct FieldSignals {
    value: RwSignal<String>,
    dirty: RwSignal<bool>,
    saving: RwSignal<bool>,
}

impl FieldSignals {
    fn new() -> Self {
        Self {
            value: RwSignal::new(String::new()),
            dirty: RwSignal::new(false),
            saving: RwSignal::new(false),
        }
    }
}

/// Single source of truth for the note view: the current value of each
/// tracked field plus its dirty/in-flight flags, and the derived preview
/// width used only for editor sizing.
///
/// One store per mounted note view; the backend it writes through is
/// injected via [`NoteSyncController`], never ambient.
#[derive(Clone, Copy)]
pub(crate) struct FieldStore {
    name: FieldSignals,
    content: FieldSignals,

    /// Measured from the rendered preview; excluded from dirty tracking.
    pub preview_width: RwSignal<f64>,

    /// Message of the most recent failed save, cleared by the next success.
    pub save_error: RwSignal<Option<String>>,

    /// Set when the backend refuses a write for a dead session; the view
    /// routes the user back through login.
    pub session_expired: RwSignal<bool>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self {
            name: FieldSignals::new(),
            content: FieldSignals::new(),
            preview_width: RwSignal::new(0.0),
            save_error: RwSignal::new(None),
            session_expired: RwSignal::new(false),
        }
    }

    fn field(&self, field: NoteField) -> FieldSignals {
        match field {
            NoteField::Name => self.name,
            NoteField::Content => self.content,
        }
    }

    /// Reactive read of a field's value.
    pub fn value(&self, field: NoteField) -> RwSignal<String> {
        self.field(field).value
    }

    pub fn get_untracked(&self, field: NoteField) -> String {
        self.field(field).value.get_untracked()
    }

    pub fn dirty(&self, field: NoteField) -> RwSignal<bool> {
        self.field(field).dirty
    }

    pub fn saving(&self, field: NoteField) -> RwSignal<bool> {
        self.field(field).saving
    }

    /// Record a user edit: value updates synchronously (subscribed views are
    /// notified before this returns) and the field becomes dirty.
    pub fn apply_edit(&self, field: NoteField, value: &str) {
        let f = self.field(field);
        f.value.set(value.to_string());
        f.dirty.set(true);
    }

    /// Flip the in-flight flag. Completions can land after the owning view
    /// unmounted, so a disposed store is a no-op, never a panic.
    pub fn mark_saving(&self, field: NoteField, in_flight: bool) {
        let _ = self.field(field).saving.try_set(in_flight);
    }

    /// Clear the dirty flag only if the acknowledged value is still the
    /// current one. A newer edit pending behind the ack keeps the field
    /// dirty. Returns whether the ack was accepted; a disposed store
    /// accepts nothing.
    pub fn mark_clean(&self, field: NoteField, acknowledged_value: &str) -> bool {
        let f = self.field(field);
        match f.value.try_get_untracked() {
            Some(current) if current == acknowledged_value => {
                let _ = f.dirty.try_set(false);
                true
            }
            _ => false,
        }
    }

    /// Bulk-replace both fields without dirtying them. Used for the initial
    /// fetch and after a backend swap; never fires the schedulers.
    pub fn load(&self, doc: &NoteDoc) {
        for (f, v) in [(self.name, &doc.name), (self.content, &doc.content)] {
            f.value.set(v.clone());
            f.dirty.set(false);
            f.saving.set(false);
        }
        self.save_error.set(None);
    }

    /// Reactive: true while any field has an unconfirmed edit.
    pub fn any_dirty(&self) -> bool {
        self.name.dirty.get() || self.content.dirty.get()
    }

    pub fn any_dirty_untracked(&self) -> bool {
        self.name.dirty.get_untracked() || self.content.dirty.get_untracked()
    }

    pub fn any_saving(&self) -> bool {
        self.name.saving.get() || self.content.saving.get()
    }
}

#[derive(Clone)]
struct SchedulerSlot {
    quiet_ms: i64,
    state: Arc<Mutex<DebounceState>>,
    timer_id: Arc<Mutex<Option<i32>>>,
}

impl SchedulerSlot {
    fn new(quiet_ms: i64) -> Self {
        Self {
            quiet_ms,
            state: Arc::new(Mutex::new(DebounceState::new())),
            timer_id: Arc::new(Mutex::new(None)),
        }
    }

    fn clear_timer(&self) {
        let tid = match self.timer_id.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(tid) = tid {
            if let Some(win) = web_sys::window() {
                let _ = win.clear_timeout_with_handle(tid);
            }
        }
    }
}

/// Owns the field store, one debounce scheduler per field, and the versioned
/// backend binding. Every write the engine issues flows through here.
#[derive(Clone)]
pub(crate) struct NoteSyncController {
    pub store: FieldStore,
    binding: RwSignal<BackendBinding>,
    name_sched: SchedulerSlot,
    content_sched: SchedulerSlot,
}

impl NoteSyncController {
    pub fn new(backend: NoteBackend) -> Self {
        Self {
            store: FieldStore::new(),
            binding: RwSignal::new(BackendBinding::new(backend)),
            name_sched: SchedulerSlot::new(NAME_QUIET_MS),
            content_sched: SchedulerSlot::new(CONTENT_QUIET_MS),
        }
    }

    fn sched(&self, field: NoteField) -> &SchedulerSlot {
        match field {
            NoteField::Name => &self.name_sched,
            NoteField::Content => &self.content_sched,
        }
    }

    /// User edit entry point: update the store synchronously, then restart
    /// the field's quiet-period timer with the new pending value.
    pub fn set(&self, field: NoteField, value: &str) {
        self.store.apply_edit(field, value);

        let sched = self.sched(field);
        if let Ok(mut state) = sched.state.lock() {
            state.notify(value, now_ms(), sched.quiet_ms);
        }
        self.restart_timer(field);
    }

    fn restart_timer(&self, field: NoteField) {
        let sched = self.sched(field);
        sched.clear_timer();

        let Some(win) = web_sys::window() else {
            return;
        };

        let c2 = self.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            c2.fire_due(field);
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                sched.quiet_ms as i32,
            )
            .unwrap_or(0);
        if let Ok(mut slot) = sched.timer_id.lock() {
            *slot = Some(tid);
        }
    }

    fn fire_due(&self, field: NoteField) {
        let sched = self.sched(field);
        if let Ok(mut slot) = sched.timer_id.lock() {
            slot.take();
        }
        // take_due re-checks the deadline; a stale callback that escaped
        // clear_timeout finds nothing to write.
        let due = match sched.state.lock() {
            Ok(mut state) => state.take_due(now_ms()),
            Err(_) => None,
        };
        let Some(value) = due else {
            return;
        };
        self.dispatch(field, value);
    }

    /// Write a pending edit immediately, skipping the remainder of its quiet
    /// period. Used on teardown, pagehide, and before a binding swap.
    pub fn flush_now(&self, field: NoteField) {
        let sched = self.sched(field);
        sched.clear_timer();
        let pending = match sched.state.lock() {
            Ok(mut state) => state.take_any(),
            Err(_) => None,
        };
        let Some(value) = pending else {
            return;
        };
        self.dispatch(field, value);
    }

    pub fn flush_all(&self) {
        self.flush_now(NoteField::Name);
        self.flush_now(NoteField::Content);
    }

    fn dispatch(&self, field: NoteField, value: String) {
        let BackendBinding {
            generation,
            backend,
        } = self.binding.get_untracked();

        self.store.mark_saving(field, true);

        let c2 = self.clone();
        spawn_local(async move {
            let result = backend.save(field, &value).await;

            // In-flight is a field-local fact; clear it even when the
            // binding has moved on. The owning view may already be torn
            // down by now, so every signal access below tolerates disposal.
            c2.store.mark_saving(field, false);

            // A binding swap while this write was in flight orphans it: the
            // old backend may well have persisted the value, but the new
            // binding has not, so dirty and the error slot stay untouched.
            let live = c2.binding.try_get_untracked().map(|b| b.generation);
            if live != Some(generation) {
                return;
            }

            match result {
                Ok(()) => {
                    c2.store.mark_clean(field, &value);
                    let _ = c2.store.save_error.try_set(None);
                }
                Err(e) => {
                    if e.kind == SyncErrorKind::Unauthorized {
                        let _ = c2.store.session_expired.try_set(true);
                    }
                    // Field stays dirty; the next edit-and-debounce cycle
                    // (or an explicit flush) retries.
                    let _ = c2
                        .store
                        .save_error
                        .try_set(Some(format!("{} not saved: {}", field.as_str(), e)));
                }
            }
        });
    }

    /// Reactive read of the binding generation; it only moves on a swap.
    pub fn generation(&self) -> u64 {
        self.binding.with(|b| b.generation)
    }

    /// Replace the active backend. Pending quiet-period values are flushed
    /// against the outgoing backend first; their completions can no longer
    /// touch dirty or the error slot once the generation moves on.
    pub fn swap_backend(&self, backend: NoteBackend) {
        self.flush_all();
        self.binding.update(|b| b.swap(backend));
    }

    /// Seed the store from the active backend. The caller owns the loading /
    /// blocked-on-error view state.
    pub async fn load_from_backend(&self) -> Result<NoteDoc, LoadError> {
        let backend = self.binding.get_untracked().backend;
        let doc = backend.load().await?;
        self.store.load(&doc);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, content: &str) -> NoteDoc {
        NoteDoc {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn edit_sets_value_and_dirty_synchronously() {
        let store = FieldStore::new();
        store.apply_edit(NoteField::Content, "hi");
        assert_eq!(store.get_untracked(NoteField::Content), "hi");
        assert!(store.dirty(NoteField::Content).get_untracked());
        assert!(!store.dirty(NoteField::Name).get_untracked());
    }

    #[test]
    fn clean_ack_for_current_value_clears_dirty() {
        let store = FieldStore::new();
        store.apply_edit(NoteField::Content, "hi");
        assert!(store.mark_clean(NoteField::Content, "hi"));
        assert!(!store.dirty(NoteField::Content).get_untracked());
    }

    #[test]
    fn stale_ack_is_ignored() {
        let store = FieldStore::new();
        store.apply_edit(NoteField::Content, "x");
        // Save for "x" dispatched; user keeps typing before it resolves.
        store.apply_edit(NoteField::Content, "xy");

        assert!(!store.mark_clean(NoteField::Content, "x"));
        assert!(store.dirty(NoteField::Content).get_untracked());

        // The write for "xy" eventually completes and is accepted.
        assert!(store.mark_clean(NoteField::Content, "xy"));
        assert!(!store.dirty(NoteField::Content).get_untracked());
    }

    #[test]
    fn load_replaces_values_without_dirtying() {
        let store = FieldStore::new();
        store.apply_edit(NoteField::Name, "typed");
        store.mark_saving(NoteField::Name, true);

        store.load(&doc("My note", "body"));

        assert_eq!(store.get_untracked(NoteField::Name), "My note");
        assert_eq!(store.get_untracked(NoteField::Content), "body");
        assert!(!store.any_dirty_untracked());
        assert!(!store.saving(NoteField::Name).get_untracked());
    }

    #[test]
    fn failed_save_leaves_dirty_set() {
        let store = FieldStore::new();
        store.apply_edit(NoteField::Name, "v1");
        store.mark_saving(NoteField::Name, true);

        // Completion path for a rejected save: no mark_clean call at all.
        store.save_error.set(Some("network down".to_string()));
        store.mark_saving(NoteField::Name, false);

        assert!(store.dirty(NoteField::Name).get_untracked());
        assert!(!store.saving(NoteField::Name).get_untracked());
        assert!(store.save_error.get_untracked().is_some());
    }

    #[test]
    fn guard_condition_tracks_either_field() {
        let store = FieldStore::new();
        assert!(!store.any_dirty_untracked());

        store.apply_edit(NoteField::Name, "n");
        assert!(store.any_dirty_untracked());

        store.mark_clean(NoteField::Name, "n");
        assert!(!store.any_dirty_untracked());

        store.apply_edit(NoteField::Content, "c");
        assert!(store.any_dirty_untracked());
    }

    #[test]
    fn completion_after_view_teardown_is_inert() {
        let owner = Owner::new();
        let store = owner.with(FieldStore::new);
        store.apply_edit(NoteField::Name, "v1");
        store.mark_saving(NoteField::Name, true);
        drop(owner);

        // A save resolving after unmount lands on disposed signals; the
        // completion path must treat that as a no-op.
        store.mark_saving(NoteField::Name, false);
        assert!(!store.mark_clean(NoteField::Name, "v1"));
        assert!(store.save_error.try_set(None).is_some());
    }

    #[test]
    fn fields_do_not_interact() {
        let store = FieldStore::new();
        store.apply_edit(NoteField::Name, "n1");
        store.apply_edit(NoteField::Content, "c1");

        assert!(store.mark_clean(NoteField::Name, "n1"));
        assert!(store.dirty(NoteField::Content).get_untracked());
        assert!(!store.dirty(NoteField::Name).get_untracked());
    }
}
