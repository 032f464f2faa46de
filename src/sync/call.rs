// One-shot request state
//
// For imperative calls (button-triggered actions) that should not be cached
// or deduplicated. Unlike a Resource, a failure clears the previous data.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct CallState<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub loading: bool,
}

impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

#[derive(Debug)]
pub struct ApiCall<T> {
    state: Mutex<CallState<T>>,
}

impl<T> Default for ApiCall<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(CallState::default()),
        }
    }
}

impl<T: Clone> ApiCall<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CallState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> CallState<T> {
        self.lock().clone()
    }

    /// Run the request, recording its outcome
    pub async fn execute<F>(&self, request: F) -> Option<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let result = request.await;
        let mut state = self.lock();
        match result {
            Ok(data) => {
                *state = CallState {
                    data: Some(data.clone()),
                    error: None,
                    loading: false,
                };
                Some(data)
            }
            Err(err) => {
                *state = CallState {
                    data: None,
                    error: Some(err),
                    loading: false,
                };
                None
            }
        }
    }

    pub fn reset(&self) {
        *self.lock() = CallState::default();
    }
}
