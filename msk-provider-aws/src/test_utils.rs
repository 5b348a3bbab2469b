//! Helpers shared by the in-memory API fakes

use std::collections::VecDeque;

use crate::error::ApiError;

pub(crate) fn api_error(operation: &'static str, message: &str) -> ApiError {
    ApiError::Aws {
        operation,
        code: None,
        message: message.to_string(),
    }
}

/// Scripted responses; once drained the last answer repeats
pub(crate) struct Script<T> {
    queue: VecDeque<Result<T, String>>,
    last: T,
}

impl<T: Default> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            last: T::default(),
        }
    }
}

impl<T: Clone> Script<T> {
    pub(crate) fn push(&mut self, item: Result<T, String>) {
        self.queue.push_back(item);
    }

    pub(crate) fn next(&mut self) -> Result<T, String> {
        match self.queue.pop_front() {
            Some(Ok(item)) => {
                self.last = item.clone();
                Ok(item)
            }
            Some(Err(message)) => Err(message),
            None => Ok(self.last.clone()),
        }
    }
}
