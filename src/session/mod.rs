//! Session-driven profile loading.
//!
//! The orchestrator reacts to auth-session transitions and materializes a
//! consistent `(user, streak)` pair per transition. Rapid repeated
//! transitions are safe: each load captures a generation number, and a load
//! whose generation is no longer current discards its result instead of
//! publishing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::profile::{Focus, NotificationPreferences, Profile};
use crate::repo::{MoodStore, ProfileStore};
use crate::streak::calculate_streak;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// What the auth layer knows about a signed-in identity. The metadata map
/// is free-form and may carry a display name.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub metadata: serde_json::Map<String, Value>,
}

impl Session {
    /// Name fallback chain used when no profile row exists yet.
    pub fn display_name(&self) -> String {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.user_id.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub user_id: Uuid,
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            kind: SessionEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn refreshed(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            kind: SessionEventKind::TokenRefreshed,
            session: Some(session),
        }
    }

    pub fn signed_out(user_id: Uuid) -> Self {
        Self {
            user_id,
            kind: SessionEventKind::SignedOut,
            session: None,
        }
    }
}

/// Published account state for display consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: String,
    pub focus: Option<Focus>,
    pub avatar_url: Option<String>,
    pub is_premium: bool,
    pub notification_preferences: NotificationPreferences,
    pub push_subscription: Option<Value>,
}

impl SessionUser {
    fn from_profile(session: &Session, profile: Profile, push_subscription: Option<Value>) -> Self {
        let notification_preferences = profile.notification_preferences();
        Self {
            id: session.user_id,
            email: session.email.clone(),
            name: profile.name,
            focus: profile.focus,
            avatar_url: profile.avatar_url,
            is_premium: profile.is_premium,
            notification_preferences,
            push_subscription,
        }
    }

    fn fallback(session: &Session, name: String) -> Self {
        Self {
            id: session.user_id,
            email: session.email.clone(),
            name,
            focus: None,
            avatar_url: None,
            is_premium: false,
            notification_preferences: NotificationPreferences::default(),
            push_subscription: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionSnapshot {
    SignedOut,
    Loading,
    Ready { user: SessionUser, streak: u32 },
}

/// Single writer of the published `(user, streak)` state; any number of
/// readers subscribe through the watch channel.
pub struct SessionOrchestrator<P, M> {
    profiles: P,
    moods: M,
    generation: Arc<AtomicU64>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl<P, M> SessionOrchestrator<P, M>
where
    P: ProfileStore + Clone + Send + Sync + 'static,
    M: MoodStore + Clone + Send + Sync + 'static,
{
    pub fn new(profiles: P, moods: M) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::SignedOut);
        Self {
            profiles,
            moods,
            generation: Arc::new(AtomicU64::new(0)),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// React to one auth-session transition. Starting a new load supersedes
    /// any load still in flight; only the most recently initiated load may
    /// publish. Sign-out clears the state immediately.
    pub fn handle_event(&self, event: SessionEvent) -> Option<JoinHandle<()>> {
        tracing::debug!(user_id = %event.user_id, kind = ?event.kind, "Session event");
        match event.session {
            Some(session) => Some(self.start_load(session)),
            None => {
                self.generation.fetch_add(1, Ordering::AcqRel);
                self.snapshot_tx.send_replace(SessionSnapshot::SignedOut);
                None
            }
        }
    }

    fn start_load(&self, session: Session) -> JoinHandle<()> {
        let my_gen = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.snapshot_tx.send_replace(SessionSnapshot::Loading);

        let profiles = self.profiles.clone();
        let moods = self.moods.clone();
        let generation = Arc::clone(&self.generation);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);

        tokio::spawn(async move {
            let user_id = session.user_id;

            // No ordering dependency between the two fetches.
            let (profile_res, dates_res) = tokio::join!(
                profiles.profile_by_id(user_id),
                moods.history_dates(user_id),
            );

            let still_current = || generation.load(Ordering::Acquire) == my_gen;
            if !still_current() {
                return;
            }

            let profile = match profile_res {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to load profile");
                    snapshot_tx.send_replace(SessionSnapshot::SignedOut);
                    return;
                }
            };

            let Some(profile) = profile else {
                // Self-healing: an authenticated identity without a profile
                // row gets a minimal default instead of an error.
                tracing::warn!(user_id = %user_id, "Profile row missing, creating default");
                let name = session.display_name();
                if let Err(e) = profiles.create_default(user_id, &name).await {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to create default profile");
                    if still_current() {
                        snapshot_tx.send_replace(SessionSnapshot::SignedOut);
                    }
                    return;
                }
                if still_current() {
                    snapshot_tx.send_replace(SessionSnapshot::Ready {
                        user: SessionUser::fallback(&session, name),
                        streak: 0,
                    });
                }
                return;
            };

            let streak = match dates_res {
                Ok(dates) => calculate_streak(&dates),
                Err(e) => {
                    // Streak degrades to zero rather than blocking sign-in.
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to load mood dates");
                    0
                }
            };

            let push_subscription = match profiles.push_subscription(user_id).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Could not fetch push subscription");
                    None
                }
            };

            if still_current() {
                snapshot_tx.send_replace(SessionSnapshot::Ready {
                    user: SessionUser::from_profile(&session, profile, push_subscription),
                    streak,
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProfileError, RepositoryError};
    use crate::models::mood::MoodEntry;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn repo_err(context: &str) -> RepositoryError {
        RepositoryError::new(context.to_string(), sqlx::Error::RowNotFound)
    }

    fn test_profile(name: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            focus: Some(Focus::Anxiety),
            avatar_url: None,
            is_premium: false,
            notification_preferences: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_session(name: Option<&str>) -> Session {
        let mut metadata = serde_json::Map::new();
        if let Some(name) = name {
            metadata.insert("name".into(), Value::String(name.into()));
        }
        Session {
            user_id: Uuid::new_v4(),
            email: Some("ana@example.com".into()),
            metadata,
        }
    }

    #[derive(Clone, Default)]
    struct FakeProfiles {
        profile: Option<Profile>,
        fail_fetch: bool,
        created: Arc<Mutex<Vec<String>>>,
    }

    impl ProfileStore for FakeProfiles {
        async fn profile_by_id(&self, _user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
            if self.fail_fetch {
                return Err(repo_err("Failed to fetch profile"));
            }
            Ok(self.profile.clone())
        }

        async fn create_default(&self, _user_id: Uuid, name: &str) -> Result<(), ProfileError> {
            self.created.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn push_subscription(&self, _user_id: Uuid) -> Result<Option<Value>, RepositoryError> {
            Ok(None)
        }
    }

    /// Mood store whose first `history_dates` call blocks until released,
    /// to stage overlapping loads.
    #[derive(Clone)]
    struct FakeMoods {
        first: Vec<DateTime<Utc>>,
        rest: Vec<DateTime<Utc>>,
        fail: bool,
        gate_first: bool,
        gate: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeMoods {
        fn returning(dates: Vec<DateTime<Utc>>) -> Self {
            Self {
                first: dates.clone(),
                rest: dates,
                fail: false,
                gate_first: false,
                gate: Arc::new(Notify::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn gated(first: Vec<DateTime<Utc>>, rest: Vec<DateTime<Utc>>) -> Self {
            Self {
                first,
                rest,
                fail: false,
                gate_first: true,
                gate: Arc::new(Notify::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            let mut moods = Self::returning(vec![]);
            moods.fail = true;
            moods
        }
    }

    impl MoodStore for FakeMoods {
        async fn history_dates(&self, _user_id: Uuid) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
            if self.fail {
                return Err(repo_err("Failed to fetch mood history dates"));
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                if self.gate_first {
                    self.gate.notified().await;
                }
                Ok(self.first.clone())
            } else {
                Ok(self.rest.clone())
            }
        }

        async fn history(&self, _user_id: Uuid, _limit: i64) -> Result<Vec<MoodEntry>, RepositoryError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn successful_load_publishes_user_and_streak() {
        let profiles = FakeProfiles {
            profile: Some(test_profile("Ana")),
            ..Default::default()
        };
        let moods = FakeMoods::returning(vec![Utc::now(), Utc::now() - Duration::days(1)]);
        let orchestrator = SessionOrchestrator::new(profiles, moods);

        let handle = orchestrator.handle_event(SessionEvent::signed_in(test_session(None)));
        handle.unwrap().await.unwrap();

        match orchestrator.snapshot() {
            SessionSnapshot::Ready { user, streak } => {
                assert_eq!(user.name, "Ana");
                assert_eq!(user.focus, Some(Focus::Anxiety));
                assert_eq!(streak, 2);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn superseding_load_wins_even_if_it_finishes_first() {
        let profiles = FakeProfiles {
            profile: Some(test_profile("Ana")),
            ..Default::default()
        };
        // Load A (gated) would yield streak 1; load B yields streak 2.
        let moods = FakeMoods::gated(
            vec![Utc::now()],
            vec![Utc::now(), Utc::now() - Duration::days(1)],
        );
        let gate = Arc::clone(&moods.gate);
        let calls = Arc::clone(&moods.calls);
        let orchestrator = SessionOrchestrator::new(profiles, moods);

        let load_a = orchestrator
            .handle_event(SessionEvent::signed_in(test_session(None)))
            .unwrap();
        // Let load A claim the gated first fetch before initiating load B.
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let load_b = orchestrator
            .handle_event(SessionEvent::signed_in(test_session(None)))
            .unwrap();

        load_b.await.unwrap();
        gate.notify_one();
        load_a.await.unwrap();

        match orchestrator.snapshot() {
            SessionSnapshot::Ready { streak, .. } => assert_eq!(streak, 2),
            other => panic!("expected Ready from load B, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sign_out_discards_in_flight_load() {
        let profiles = FakeProfiles {
            profile: Some(test_profile("Ana")),
            ..Default::default()
        };
        let moods = FakeMoods::gated(vec![Utc::now()], vec![]);
        let gate = Arc::clone(&moods.gate);
        let orchestrator = SessionOrchestrator::new(profiles, moods);

        let session = test_session(None);
        let user_id = session.user_id;
        let load = orchestrator
            .handle_event(SessionEvent::signed_in(session))
            .unwrap();
        orchestrator.handle_event(SessionEvent::signed_out(user_id));

        gate.notify_one();
        load.await.unwrap();

        assert_eq!(orchestrator.snapshot(), SessionSnapshot::SignedOut);
    }

    #[tokio::test]
    async fn missing_profile_creates_default_and_publishes_streak_zero() {
        let profiles = FakeProfiles::default();
        let created = Arc::clone(&profiles.created);
        let moods = FakeMoods::returning(vec![Utc::now()]);
        let orchestrator = SessionOrchestrator::new(profiles, moods);

        let handle = orchestrator.handle_event(SessionEvent::signed_in(test_session(Some("Ana"))));
        handle.unwrap().await.unwrap();

        assert_eq!(created.lock().unwrap().as_slice(), ["Ana"]);
        match orchestrator.snapshot() {
            SessionSnapshot::Ready { user, streak } => {
                assert_eq!(user.name, "Ana");
                assert!(!user.is_premium);
                assert_eq!(streak, 0);
            }
            other => panic!("expected Ready with defaults, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mood_dates_failure_degrades_streak_to_zero() {
        let profiles = FakeProfiles {
            profile: Some(test_profile("Ana")),
            ..Default::default()
        };
        let orchestrator = SessionOrchestrator::new(profiles, FakeMoods::failing());

        let handle = orchestrator.handle_event(SessionEvent::signed_in(test_session(None)));
        handle.unwrap().await.unwrap();

        match orchestrator.snapshot() {
            SessionSnapshot::Ready { user, streak } => {
                assert_eq!(user.name, "Ana");
                assert_eq!(streak, 0);
            }
            other => panic!("expected degraded Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn profile_fetch_failure_clears_published_state() {
        let profiles = FakeProfiles {
            fail_fetch: true,
            ..Default::default()
        };
        let orchestrator = SessionOrchestrator::new(profiles, FakeMoods::returning(vec![]));

        let handle = orchestrator.handle_event(SessionEvent::signed_in(test_session(None)));
        handle.unwrap().await.unwrap();

        assert_eq!(orchestrator.snapshot(), SessionSnapshot::SignedOut);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let session = test_session(None);
        assert_eq!(session.display_name(), "ana@example.com");

        let session = test_session(Some("Ana"));
        assert_eq!(session.display_name(), "Ana");
    }
}
