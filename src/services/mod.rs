//! Business logic services

pub mod attempts;
pub mod attendance;
pub mod cleanup;
pub mod codes;
pub mod redis;
pub mod sessions;

use std::sync::Arc;

use crate::{clock::Clock, config::AttendanceConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub sessions: sessions::SessionService,
    pub attendance: attendance::AttendanceService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        config: AttendanceConfig,
        clock: Arc<dyn Clock>,
        attempt_store: Arc<dyn attempts::AttemptStore>,
    ) -> Self {
        let guard = attempts::AttemptGuard::new(attempt_store, &config);
        let sessions = sessions::SessionService::new(repository.clone(), config.clone(), clock.clone());
        let attendance =
            attendance::AttendanceService::new(repository, sessions.clone(), guard, &config, clock);
        Self { sessions, attendance }
    }
}
