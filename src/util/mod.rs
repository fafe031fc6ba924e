pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Keep the browser tab title in sync with the note name.
pub(crate) fn set_document_title(note_name: &str) {
    let title = if note_name.trim().is_empty() {
        "mnote".to_string()
    } else {
        format!("mnote | {}", note_name.trim())
    };

    if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
        doc.set_title(&title);
    }
}
