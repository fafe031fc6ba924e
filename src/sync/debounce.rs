//! Quiet-period bookkeeping for one field.
//!
//! The browser timer is owned by the controller; this type only decides
//! which value (if any) a firing timer is allowed to write. Keeping the
//! decision here means a stale callback that escaped `clear_timeout` still
//! cannot write a superseded value.

#[derive(Debug, Default)]
pub(crate) struct DebounceState {
    pending: Option<String>,
    deadline_ms: i64,
}

impl DebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending value and push the deadline forward. Any
    /// previously pending value is discarded: only the newest value per
    /// quiet period is ever written.
    pub fn notify(&mut self, value: &str, now_ms: i64, quiet_ms: i64) {
        self.pending = Some(value.to_string());
        self.deadline_ms = now_ms + quiet_ms;
    }

    /// Consume the pending value if the quiet period has elapsed.
    pub fn take_due(&mut self, now_ms: i64) -> Option<String> {
        if self.pending.is_some() && now_ms >= self.deadline_ms {
            self.pending.take()
        } else {
            None
        }
    }

    /// Consume the pending value unconditionally (teardown / binding-swap
    /// flush path).
    pub fn take_any(&mut self) -> Option<String> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: i64 = 1000;

    #[test]
    fn nothing_due_before_deadline() {
        let mut d = DebounceState::new();
        d.notify("hi", 0, QUIET);
        assert_eq!(d.take_due(999), None);
        // Still pending; the deadline simply has not passed.
        assert_eq!(d.take_due(1000).as_deref(), Some("hi"));
    }

    #[test]
    fn single_edit_fires_once_after_quiet_period() {
        let mut d = DebounceState::new();
        d.notify("hi", 0, QUIET);
        assert_eq!(d.take_due(1000).as_deref(), Some("hi"));
        // Consumed: a second expiry produces nothing.
        assert_eq!(d.take_due(2000), None);
        assert_eq!(d.take_any(), None);
    }

    #[test]
    fn rapid_edits_coalesce_to_the_last_value() {
        let mut d = DebounceState::new();
        d.notify("a", 0, QUIET);
        d.notify("ab", 400, QUIET);
        d.notify("abc", 800, QUIET);

        // The first deadline has passed but was superseded.
        assert_eq!(d.take_due(1100), None);
        assert_eq!(d.take_due(1800).as_deref(), Some("abc"));
        assert_eq!(d.take_due(5000), None);
    }

    #[test]
    fn flush_takes_pending_regardless_of_deadline() {
        let mut d = DebounceState::new();
        d.notify("draft", 0, QUIET);
        assert_eq!(d.take_any().as_deref(), Some("draft"));
        assert_eq!(d.take_any(), None);
    }

    #[test]
    fn edit_after_fire_starts_a_fresh_period() {
        let mut d = DebounceState::new();
        d.notify("x", 0, QUIET);
        assert_eq!(d.take_due(1000).as_deref(), Some("x"));

        d.notify("xy", 1200, QUIET);
        assert_eq!(d.take_due(2100), None);
        assert_eq!(d.take_due(2200).as_deref(), Some("xy"));
    }
}
