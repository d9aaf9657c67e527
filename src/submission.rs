use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a recipe request is already pending")]
pub struct AlreadyPending;

/// Last submission and its result. Guards against double submits the way a
/// disabled button would; the recipe service itself does not.
#[derive(Debug)]
pub struct Submission {
    state: Mutex<SubmissionState>,
}

impl Default for Submission {
    fn default() -> Self {
        Self {
            state: Mutex::new(SubmissionState::Idle),
        }
    }
}

impl Submission {
    /// # Errors
    ///
    /// `AlreadyPending` while a previous submission has not finished.
    pub fn begin(&self) -> Result<(), AlreadyPending> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *st == SubmissionState::Pending {
            return Err(AlreadyPending);
        }
        *st = SubmissionState::Pending;
        Ok(())
    }

    pub fn finish<E: std::fmt::Display>(&self, result: &Result<String, E>) {
        let next = match result {
            Ok(text) => SubmissionState::Succeeded(text.clone()),
            Err(e) => SubmissionState::Failed(e.to_string()),
        };
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    #[must_use]
    pub fn current(&self) -> SubmissionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_pending_done_cycle() {
        let s = Submission::default();
        assert_eq!(s.current(), SubmissionState::Idle);

        s.begin().unwrap();
        assert_eq!(s.current(), SubmissionState::Pending);
        assert_eq!(s.begin(), Err(AlreadyPending));

        s.finish::<String>(&Ok("resep".into()));
        assert_eq!(s.current(), SubmissionState::Succeeded("resep".into()));

        // next submit discards the old result
        s.begin().unwrap();
        assert_eq!(s.current(), SubmissionState::Pending);
        s.finish::<String>(&Err("boom".into()));
        assert_eq!(s.current(), SubmissionState::Failed("boom".into()));
    }

    #[test]
    fn state_serializes_tagged() {
        let v = serde_json::to_value(SubmissionState::Succeeded("x".into())).unwrap();
        assert_eq!(v, serde_json::json!({"state": "succeeded", "detail": "x"}));
        let v = serde_json::to_value(SubmissionState::Idle).unwrap();
        assert_eq!(v, serde_json::json!({"state": "idle"}));
    }
}
