//! Shared error-injection and call-tracking plumbing for the in-memory
//! store mocks in [`crate::repository`]. Factored out once instead of
//! repeated per entity, the way the teacher's `MockTaskRepository`
//! inlined it for its single trait.

use parking_lot::Mutex;
use scrum_core::error::ScrumError;

/// Error injection + call history, composed into each `InMemory*Store`.
#[derive(Default)]
pub struct TestSupport {
    error_injection: Mutex<Option<ScrumError>>,
    call_history: Mutex<Vec<String>>,
}

impl TestSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject an error to be returned (and consumed) by the next call.
    pub fn inject_error(&self, error: ScrumError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|call| call.contains(method)),
            "Method '{}' was not called. Call history: {:?}",
            method,
            *history
        );
    }

    /// Returns the injected error, if any, consuming it.
    pub fn check_error_injection(&self) -> Result<(), ScrumError> {
        if let Some(error) = self.error_injection.lock().take() {
            return Err(error);
        }
        Ok(())
    }

    pub fn record_call(&self, method: &str) {
        self.call_history.lock().push(format!("{method}()"));
    }

    pub fn record_call_with_params(&self, method: &str, params: &str) {
        self.call_history.lock().push(format!("{method}({params})"));
    }
}
