//! In-memory stores and fixtures for service tests

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::{
    clock::Clock,
    config::{AppConfig, AttendanceConfig, AuthConfig},
    error::AppResult,
    models::{
        attendance::{AttendanceRecord, NewAttendanceRecord},
        course::Course,
        session::{AttendanceSession, NewSession},
        user::{Role, User, UserClaims},
    },
    repository::{Directory, RecordStore, Repository, ResetStore, SessionStore},
    services::{attempts::AttemptStore, Services},
    AppState,
};

pub const CS101: i64 = 1;
pub const MATH201: i64 = 2;
pub const PROF_SMITH: i64 = 100;
pub const PROF_JONES: i64 = 101;
pub const STUDENT_ALICE: i64 = 200;
pub const STUDENT_BOB: i64 = 201;
pub const STUDENT_CAROL: i64 = 202;

/// Monday 2025-03-10 09:00 UTC
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub fn claims(user_id: i64, role: Role) -> UserClaims {
    let iat = base_time().timestamp();
    UserClaims {
        sub: format!("user{}", user_id),
        user_id,
        role,
        exp: iat + 3600,
        iat,
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MemoryAttemptStore {
    counters: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn attempts(&self, key: &str) -> AppResult<u32> {
        Ok(self.counters.lock().unwrap().get(key).copied().unwrap_or(0))
    }

    async fn record_attempt(&self, key: &str, _window_secs: u64) -> AppResult<u32> {
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.counters.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Memory counter that yields around every call like a network round trip
#[derive(Default)]
pub struct YieldingAttemptStore {
    inner: MemoryAttemptStore,
}

#[async_trait]
impl AttemptStore for YieldingAttemptStore {
    async fn attempts(&self, key: &str) -> AppResult<u32> {
        tokio::task::yield_now().await;
        let count = self.inner.attempts(key).await;
        tokio::task::yield_now().await;
        count
    }

    async fn record_attempt(&self, key: &str, window_secs: u64) -> AppResult<u32> {
        tokio::task::yield_now().await;
        let count = self.inner.record_attempt(key, window_secs).await;
        tokio::task::yield_now().await;
        count
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        tokio::task::yield_now().await;
        self.inner.clear(key).await
    }
}

#[derive(Default)]
struct State {
    sessions: Vec<AttendanceSession>,
    records: Vec<AttendanceRecord>,
    resets: HashMap<(i64, i64), DateTime<Utc>>,
    courses: HashMap<i64, Course>,
    users: HashMap<i64, User>,
    memberships: HashSet<(i64, i64)>,
}

/// Every store over one shared state, enforcing the same unique
/// constraints as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn add_course(&self, id: i64, code: &str, name: &str) {
        self.state.lock().unwrap().courses.insert(
            id,
            Course {
                id,
                course_code: code.to_string(),
                course_name: name.to_string(),
            },
        );
    }

    pub fn add_user(&self, id: i64, username: &str, full_name: &str, role: Role, student_id: Option<&str>) {
        self.state.lock().unwrap().users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                full_name: full_name.to_string(),
                email: format!("{}@college.edu", username),
                role,
                student_id: student_id.map(str::to_string),
            },
        );
    }

    pub fn assign(&self, user_id: i64, course_id: i64) {
        self.state.lock().unwrap().memberships.insert((user_id, course_id));
    }

    pub fn live_sessions(&self, course_id: i64, now: DateTime<Utc>) -> Vec<AttendanceSession> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .filter(|s| s.course_id == course_id && s.is_live_at(now))
            .cloned()
            .collect()
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.state.lock().unwrap().records.clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &NewSession) -> AppResult<Option<AttendanceSession>> {
        let mut state = self.state.lock().unwrap();
        let taken = state.sessions.iter().any(|s| {
            s.active && s.course_id == session.course_id && s.verification_code == session.verification_code
        });
        if taken {
            return Ok(None);
        }
        let stored = AttendanceSession {
            id: state.sessions.len() as i64 + 1,
            course_id: session.course_id,
            professor_id: session.professor_id,
            verification_code: session.verification_code.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
            class_day: session.class_day,
            active: true,
        };
        state.sessions.push(stored.clone());
        Ok(Some(stored))
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<AttendanceSession>> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_live_by_code(
        &self,
        course_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AttendanceSession>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sessions
            .iter()
            .find(|s| s.accepts(course_id, code, now))
            .cloned())
    }

    async fn list_live_for_professor(
        &self,
        professor_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceSession>> {
        let state = self.state.lock().unwrap();
        let mut live: Vec<_> = state
            .sessions
            .iter()
            .filter(|s| s.professor_id == professor_id && s.is_live_at(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(live)
    }

    async fn count_class_days(
        &self,
        professor_id: i64,
        course_id: i64,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64> {
        let state = self.state.lock().unwrap();
        let days: HashSet<NaiveDate> = state
            .sessions
            .iter()
            .filter(|s| s.professor_id == professor_id && s.course_id == course_id)
            .filter(|s| after.map_or(true, |at| s.created_at > at))
            .map(|s| s.class_day)
            .collect();
        Ok(days.len() as i64)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let mut count = 0;
        for session in state.sessions.iter_mut() {
            if session.active && session.expires_at <= now {
                session.active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &NewAttendanceRecord) -> AppResult<Option<AttendanceRecord>> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state.records.iter().any(|r| {
            r.student_id == record.student_id
                && r.course_id == record.course_id
                && r.attendance_day == record.attendance_day
        });
        if duplicate {
            return Ok(None);
        }
        let stored = AttendanceRecord {
            id: state.records.len() as i64 + 1,
            student_id: record.student_id,
            course_id: record.course_id,
            session_id: record.session_id,
            timestamp: record.timestamp,
            attendance_day: record.attendance_day,
            verified: true,
        };
        state.records.push(stored.clone());
        Ok(Some(stored))
    }

    async fn find_for_day(
        &self,
        student_id: i64,
        course_id: i64,
        day: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .find(|r| r.student_id == student_id && r.course_id == course_id && r.attendance_day == day)
            .cloned())
    }

    async fn list_attendee_ids(&self, session_id: i64) -> AppResult<Vec<i64>> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<_> = state
            .records
            .iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| r.student_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn list_for_student(&self, student_id: i64, course_id: i64) -> AppResult<Vec<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .records
            .iter()
            .filter(|r| r.student_id == student_id && r.course_id == course_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    async fn list_for_course_day(&self, course_id: i64, day: NaiveDate) -> AppResult<Vec<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .records
            .iter()
            .filter(|r| r.course_id == course_id && r.attendance_day == day)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.timestamp, r.id));
        Ok(records)
    }
}

#[async_trait]
impl ResetStore for MemoryStore {
    async fn get_reset(&self, professor_id: i64, course_id: i64) -> AppResult<Option<DateTime<Utc>>> {
        let state = self.state.lock().unwrap();
        Ok(state.resets.get(&(professor_id, course_id)).copied())
    }

    async fn upsert_reset(&self, professor_id: i64, course_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.resets.insert((professor_id, course_id), at);
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn get_course(&self, course_id: i64) -> AppResult<Option<Course>> {
        Ok(self.state.lock().unwrap().courses.get(&course_id).cloned())
    }

    async fn get_courses(&self, course_ids: &[i64]) -> AppResult<Vec<Course>> {
        let state = self.state.lock().unwrap();
        let mut courses: Vec<_> = course_ids
            .iter()
            .filter_map(|id| state.courses.get(id).cloned())
            .collect();
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    async fn teaches(&self, professor_id: i64, course_id: i64) -> AppResult<bool> {
        let state = self.state.lock().unwrap();
        let is_professor = state
            .users
            .get(&professor_id)
            .map_or(false, |u| u.role == Role::Professor);
        Ok(is_professor && state.memberships.contains(&(professor_id, course_id)))
    }

    async fn is_enrolled(&self, student_id: i64, course_id: i64) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .memberships
            .contains(&(student_id, course_id)))
    }

    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn get_users(&self, user_ids: &[i64]) -> AppResult<Vec<User>> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<_> = user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Seeded directory, manual clock and services wired over memory stores
///
/// Smith teaches CS101 and MATH201, Jones teaches CS101. Alice and Bob are
/// enrolled in CS101, Alice also in MATH201. Carol is enrolled nowhere.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(AttendanceConfig::default())
    }

    pub fn with_code_length(code_length: usize) -> Self {
        Self::with_config(AttendanceConfig {
            code_length,
            ..Default::default()
        })
    }

    pub fn with_config(config: AttendanceConfig) -> Self {
        Self::with_attempt_store(config, Arc::new(MemoryAttemptStore::default()))
    }

    pub fn with_attempt_store(config: AttendanceConfig, attempts: Arc<dyn AttemptStore>) -> Self {
        let store = Arc::new(MemoryStore::default());
        store.add_course(CS101, "CS101", "Introduction to Computer Science");
        store.add_course(MATH201, "MATH201", "Linear Algebra");
        store.add_user(PROF_SMITH, "prof.smith", "Ada Smith", Role::Professor, None);
        store.add_user(PROF_JONES, "prof.jones", "Alan Jones", Role::Professor, None);
        store.add_user(STUDENT_ALICE, "alice", "Alice Martin", Role::Student, Some("S-2024-001"));
        store.add_user(STUDENT_BOB, "bob", "Bob Chen", Role::Student, None);
        store.add_user(STUDENT_CAROL, "carol", "Carol Diaz", Role::Student, Some("S-2024-003"));
        store.assign(PROF_SMITH, CS101);
        store.assign(PROF_SMITH, MATH201);
        store.assign(PROF_JONES, CS101);
        store.assign(STUDENT_ALICE, CS101);
        store.assign(STUDENT_ALICE, MATH201);
        store.assign(STUDENT_BOB, CS101);

        let clock = Arc::new(ManualClock::new(base_time()));
        let repository = Repository::from_stores(store.clone(), store.clone(), store.clone(), store.clone());
        let services = Services::new(repository, config, clock.clone(), attempts);

        Self {
            store,
            clock,
            services,
        }
    }

    pub fn t0(&self) -> DateTime<Utc> {
        base_time()
    }

    pub fn professor(&self, user_id: i64) -> UserClaims {
        claims(user_id, Role::Professor)
    }

    pub fn student(&self, user_id: i64) -> UserClaims {
        claims(user_id, Role::Student)
    }

    /// Handler state over the fixture's services
    pub fn app_state(&self) -> AppState {
        let config = AppConfig {
            server: Default::default(),
            database: Default::default(),
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
            },
            logging: Default::default(),
            redis: Default::default(),
            attendance: AttendanceConfig::default(),
        };
        AppState {
            config: Arc::new(config),
            services: Arc::new(self.services.clone()),
        }
    }
}
