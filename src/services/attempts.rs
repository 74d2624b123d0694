//! Verification-code guesses, counted per student and course

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::AttendanceConfig,
    error::{AppError, AppResult},
};

/// Keyed attempt counter shared by every server instance
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn attempts(&self, key: &str) -> AppResult<u32>;

    /// Atomically count one attempt and return the new total. The window
    /// starts with the first attempt and the counter disappears when it lapses.
    async fn record_attempt(&self, key: &str, window_secs: u64) -> AppResult<u32>;

    async fn clear(&self, key: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct AttemptGuard {
    store: Arc<dyn AttemptStore>,
    max_attempts: u32,
    window_secs: u64,
}

impl AttemptGuard {
    pub fn new(store: Arc<dyn AttemptStore>, config: &AttendanceConfig) -> Self {
        Self {
            store,
            max_attempts: config.max_failed_attempts,
            window_secs: config.failed_attempt_window_secs,
        }
    }

    fn key(student_id: i64, course_id: i64) -> String {
        format!("attendance:code_attempts:{}:{}", student_id, course_id)
    }

    fn enabled(&self) -> bool {
        self.max_attempts > 0
    }

    fn exhausted(student_id: i64, course_id: i64, attempts: u32) -> AppError {
        tracing::warn!(student_id, course_id, attempts, "Verification code attempts exhausted");
        AppError::RateLimited(
            "Too many invalid verification codes. Please try again later.".to_string(),
        )
    }

    /// Read-only check that spares a counter bump once the budget is spent
    pub async fn ensure_allowed(&self, student_id: i64, course_id: i64) -> AppResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        let attempts = self.store.attempts(&Self::key(student_id, course_id)).await?;
        if attempts >= self.max_attempts {
            return Err(Self::exhausted(student_id, course_id, attempts));
        }
        Ok(())
    }

    /// Claim one guess before the code is evaluated. The increment is the
    /// gate, so concurrent guesses can never exceed the budget.
    pub async fn acquire(&self, student_id: i64, course_id: i64) -> AppResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        let attempts = self
            .store
            .record_attempt(&Self::key(student_id, course_id), self.window_secs)
            .await?;
        if attempts > self.max_attempts {
            return Err(Self::exhausted(student_id, course_id, attempts));
        }
        tracing::debug!(student_id, course_id, attempts, "Verification code attempt counted");
        Ok(())
    }

    pub async fn clear(&self, student_id: i64, course_id: i64) -> AppResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        self.store.clear(&Self::key(student_id, course_id)).await
    }
}
