//! Pre-join setup: start/end gating, display name and device toggle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Preferences;
use crate::error::{ClassMeetError, ClassMeetResult};

/// The call handle the setup screen acts on.
#[async_trait]
pub trait CallSession: Send + Sync {
    /// Store `name` as the `displayName` custom field of the call.
    async fn update_display_name(&self, name: &str) -> ClassMeetResult<()>;
    async fn join(&self) -> ClassMeetResult<()>;
    async fn set_camera_enabled(&self, enabled: bool) -> ClassMeetResult<()>;
    async fn set_microphone_enabled(&self, enabled: bool) -> ClassMeetResult<()>;
}

/// Whether the setup screen may offer joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", rename_all = "camelCase")]
pub enum JoinGate {
    NotStarted { starts_at: DateTime<Utc> },
    Ended,
    Ready,
}

impl JoinGate {
    pub fn evaluate(
        starts_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match (starts_at, ended_at) {
            (Some(starts_at), _) if starts_at > now => JoinGate::NotStarted { starts_at },
            (_, Some(_)) => JoinGate::Ended,
            _ => JoinGate::Ready,
        }
    }

    /// Alert text for a blocked gate.
    pub fn message(&self) -> Option<String> {
        match self {
            JoinGate::NotStarted { starts_at } => Some(format!(
                "Your Meeting has not started yet. It is scheduled for {}",
                starts_at.format("%-m/%-d/%Y, %-I:%M:%S %p")
            )),
            JoinGate::Ended => Some("The call has been ended by the host".to_string()),
            JoinGate::Ready => None,
        }
    }
}

/// Name to prefill: the last one used, else the account username.
pub fn resolve_display_name(prefs: &Preferences, identity_username: Option<&str>) -> String {
    prefs
        .display_name()
        .filter(|n| !n.is_empty())
        .or_else(|| identity_username.map(str::to_string))
        .unwrap_or_default()
}

/// Remember `name`, publish it on the call and join.
pub async fn join<S: CallSession + ?Sized>(
    session: &S,
    prefs: &Preferences,
    name: &str,
) -> ClassMeetResult<()> {
    if name.trim().is_empty() {
        return Err(ClassMeetError::InvalidInput(
            "display name cannot be empty".to_string(),
        ));
    }

    prefs.set_display_name(name)?;
    session.update_display_name(name).await?;
    session.join().await?;
    log::info!("[SETUP] Joined as '{}'", name);
    Ok(())
}

/// Apply the "join with mic and camera off" checkbox.
pub async fn apply_device_toggle<S: CallSession + ?Sized>(
    session: &S,
    devices_off: bool,
) -> ClassMeetResult<()> {
    session.set_camera_enabled(!devices_off).await?;
    session.set_microphone_enabled(!devices_off).await?;
    log::debug!("[SETUP] Camera and microphone enabled={}", !devices_off);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeSession {
        log: Mutex<Vec<String>>,
        fail_join: bool,
    }

    #[async_trait]
    impl CallSession for FakeSession {
        async fn update_display_name(&self, name: &str) -> ClassMeetResult<()> {
            self.log.lock().push(format!("name:{}", name));
            Ok(())
        }

        async fn join(&self) -> ClassMeetResult<()> {
            if self.fail_join {
                return Err(ClassMeetError::Sdk("call is full".to_string()));
            }
            self.log.lock().push("join".to_string());
            Ok(())
        }

        async fn set_camera_enabled(&self, enabled: bool) -> ClassMeetResult<()> {
            self.log.lock().push(format!("camera:{}", enabled));
            Ok(())
        }

        async fn set_microphone_enabled(&self, enabled: bool) -> ClassMeetResult<()> {
            self.log.lock().push(format!("mic:{}", enabled));
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_join_gate() {
        let later = now() + Duration::hours(1);
        let earlier = now() - Duration::hours(1);

        assert_eq!(
            JoinGate::evaluate(Some(later), None, now()),
            JoinGate::NotStarted { starts_at: later }
        );
        assert_eq!(
            JoinGate::evaluate(Some(later), Some(earlier), now()),
            JoinGate::NotStarted { starts_at: later }
        );
        assert_eq!(
            JoinGate::evaluate(Some(earlier), Some(now()), now()),
            JoinGate::Ended
        );
        assert_eq!(JoinGate::evaluate(Some(earlier), None, now()), JoinGate::Ready);
        assert_eq!(JoinGate::evaluate(None, None, now()), JoinGate::Ready);

        assert_eq!(
            JoinGate::NotStarted { starts_at: later }.message().as_deref(),
            Some("Your Meeting has not started yet. It is scheduled for 5/6/2024, 3:00:00 PM")
        );
        assert!(JoinGate::Ready.message().is_none());
    }

    #[test]
    fn test_resolve_display_name() {
        let prefs = Preferences::in_memory();
        assert_eq!(resolve_display_name(&prefs, None), "");
        assert_eq!(resolve_display_name(&prefs, Some("ada_l")), "ada_l");

        prefs.set_display_name("Ada").unwrap();
        assert_eq!(resolve_display_name(&prefs, Some("ada_l")), "Ada");
    }

    #[tokio::test]
    async fn test_join_persists_and_publishes_name() {
        let prefs = Preferences::in_memory();
        let session = FakeSession::default();

        join(&session, &prefs, "Prof. Ada").await.unwrap();

        assert_eq!(prefs.display_name().as_deref(), Some("Prof. Ada"));
        assert_eq!(*session.log.lock(), vec!["name:Prof. Ada", "join"]);
    }

    #[tokio::test]
    async fn test_join_rejects_blank_name() {
        let prefs = Preferences::in_memory();
        let session = FakeSession::default();

        let err = join(&session, &prefs, "  ").await.unwrap_err();
        assert!(matches!(err, ClassMeetError::InvalidInput(_)));
        assert!(session.log.lock().is_empty());
        assert_eq!(prefs.display_name(), None);
    }

    #[tokio::test]
    async fn test_join_failure_is_returned() {
        let prefs = Preferences::in_memory();
        let session = FakeSession {
            fail_join: true,
            ..Default::default()
        };

        assert!(join(&session, &prefs, "Ada").await.is_err());
        assert_eq!(*session.log.lock(), vec!["name:Ada"]);
    }

    #[tokio::test]
    async fn test_device_toggle() {
        let session = FakeSession::default();
        apply_device_toggle(&session, true).await.unwrap();
        apply_device_toggle(&session, false).await.unwrap();

        assert_eq!(
            *session.log.lock(),
            vec!["camera:false", "mic:false", "camera:true", "mic:true"]
        );
    }
}
