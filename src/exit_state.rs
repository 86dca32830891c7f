#[derive(Debug, Default)]
pub(crate) struct ExitStateMachine {
    quitting: bool,
    cleanup_started: bool,
    exit_request_allowed: bool,
}

impl ExitStateMachine {
    pub(crate) fn mark_quitting(&mut self) {
        self.quitting = true;
    }

    pub(crate) fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// True only for the first caller; cleanup runs once per process.
    pub(crate) fn try_begin_cleanup(&mut self) -> bool {
        self.quitting = true;
        if self.cleanup_started {
            return false;
        }
        self.cleanup_started = true;
        true
    }

    pub(crate) fn allow_next_exit_request(&mut self) {
        self.exit_request_allowed = true;
    }

    pub(crate) fn take_exit_request_allowance(&mut self) -> bool {
        std::mem::take(&mut self.exit_request_allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::ExitStateMachine;

    #[test]
    fn cleanup_begins_once_and_marks_quitting() {
        let mut state = ExitStateMachine::default();
        assert!(!state.is_quitting());

        assert!(state.try_begin_cleanup());
        assert!(state.is_quitting());
        assert!(!state.try_begin_cleanup());
    }

    #[test]
    fn exit_allowance_is_consumed_by_one_request() {
        let mut state = ExitStateMachine::default();
        assert!(!state.take_exit_request_allowance());

        state.allow_next_exit_request();
        assert!(state.take_exit_request_allowance());
        assert!(!state.take_exit_request_allowance());
    }

    #[test]
    fn mark_quitting_does_not_start_cleanup() {
        let mut state = ExitStateMachine::default();
        state.mark_quitting();
        assert!(state.is_quitting());
        assert!(state.try_begin_cleanup());
    }
}
