//! Personal meeting rooms and scheduled meetings.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::Preferences;
use crate::config::MeetingConfig;
use crate::error::{ClassMeetError, ClassMeetResult};

/// Kind of class session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "generated/")]
pub enum MeetingType {
    #[default]
    Lecture,
    OfficeHours,
    StudyGroup,
    Other,
}

impl MeetingType {
    pub fn label(&self) -> &'static str {
        match self {
            MeetingType::Lecture => "Lecture",
            MeetingType::OfficeHours => "Office Hours",
            MeetingType::StudyGroup => "Study Group",
            MeetingType::Other => "Other",
        }
    }
}

/// Custom data attached to a call when it is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCustomData {
    pub creator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_type: Option<MeetingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recording_enabled: Option<bool>,
}

/// Payload for the SDK's get-or-create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub call_id: String,
    pub starts_at: DateTime<Utc>,
    pub custom: CallCustomData,
}

/// Link to a meeting page.
pub fn meeting_link(base_url: &str, call_id: &str) -> String {
    format!(
        "{}/meeting/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(call_id)
    )
}

/// A user's always-available meeting room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalRoom {
    pub user_id: String,
    pub meeting_id: String,
    pub topic: String,
}

impl PersonalRoom {
    /// Room for `user_id`, with any saved id and topic applied.
    pub fn load(prefs: &Preferences, user_id: &str, username: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            meeting_id: prefs
                .meeting_id_for(user_id)
                .unwrap_or_else(|| user_id.to_string()),
            topic: prefs
                .topic_for(user_id)
                .unwrap_or_else(|| format!("{}'s Meeting Room", username)),
        }
    }

    pub fn save_topic(&mut self, prefs: &Preferences, topic: &str) -> ClassMeetResult<()> {
        if topic.trim().is_empty() {
            return Err(ClassMeetError::InvalidInput("topic cannot be empty".to_string()));
        }
        prefs.set_topic(&self.user_id, topic)?;
        self.topic = topic.to_string();
        log::info!("[ROOM] Topic updated for {}", self.user_id);
        Ok(())
    }

    pub fn save_meeting_id(&mut self, prefs: &Preferences, meeting_id: &str) -> ClassMeetResult<()> {
        if meeting_id.trim().is_empty() {
            return Err(ClassMeetError::InvalidInput(
                "meeting id cannot be empty".to_string(),
            ));
        }
        prefs.set_meeting_id(&self.user_id, meeting_id)?;
        self.meeting_id = meeting_id.to_string();
        log::info!("[ROOM] Meeting id updated for {}", self.user_id);
        Ok(())
    }

    pub fn invite_link(&self, base_url: &str) -> String {
        format!("{}?personal=true", meeting_link(base_url, &self.meeting_id))
    }

    /// Request that opens the room now, used when the call does not exist yet.
    pub fn start_request(&self, now: DateTime<Utc>) -> CallRequest {
        CallRequest {
            call_id: self.meeting_id.clone(),
            starts_at: now,
            custom: CallCustomData {
                creator_id: self.user_id.clone(),
                topic: Some(self.topic.clone()),
                ..Default::default()
            },
        }
    }
}

/// Form values for scheduling a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDraft {
    pub starts_at: DateTime<Utc>,
    pub description: String,
    pub course_id: Option<String>,
    pub recording_enabled: bool,
    pub meeting_type: MeetingType,
}

impl MeetingDraft {
    /// Instant lecture starting at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            starts_at: now,
            description: String::new(),
            course_id: None,
            recording_enabled: true,
            meeting_type: MeetingType::Lecture,
        }
    }

    /// Build the create request under a fresh call id.
    pub fn into_request(
        self,
        creator_id: &str,
        now: DateTime<Utc>,
        retention_days: u32,
    ) -> CallRequest {
        CallRequest {
            call_id: Uuid::new_v4().to_string(),
            starts_at: self.starts_at,
            custom: CallCustomData {
                creator_id: creator_id.to_string(),
                topic: None,
                description: Some(self.description),
                course_id: self.course_id.filter(|c| !c.is_empty()),
                meeting_type: Some(self.meeting_type),
                retention_date: Some(now + Duration::days(i64::from(retention_days))),
                is_recording_enabled: Some(self.recording_enabled),
            },
        }
    }
}

/// Turn a draft into a create request and remember its description as the
/// creator's topic.
pub fn schedule_meeting(
    draft: MeetingDraft,
    creator_id: &str,
    now: DateTime<Utc>,
    config: &MeetingConfig,
    prefs: &Preferences,
) -> ClassMeetResult<CallRequest> {
    if !draft.description.is_empty() {
        prefs.set_topic(creator_id, &draft.description)?;
    }
    let request = draft.into_request(creator_id, now, config.retention_days);
    log::info!(
        "[ROOM] Scheduled {} for {}",
        request.call_id,
        request.starts_at
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_personal_room_defaults() {
        let prefs = Preferences::in_memory();
        let room = PersonalRoom::load(&prefs, "user_42", "ada");

        assert_eq!(room.meeting_id, "user_42");
        assert_eq!(room.topic, "ada's Meeting Room");
        assert_eq!(
            room.invite_link("https://class.example/"),
            "https://class.example/meeting/user_42?personal=true"
        );
    }

    #[test]
    fn test_personal_room_saved_values() {
        let prefs = Preferences::in_memory();
        let mut room = PersonalRoom::load(&prefs, "u1", "ada");

        room.save_topic(&prefs, "Calculus help").unwrap();
        room.save_meeting_id(&prefs, "calc room").unwrap();
        assert!(room.save_topic(&prefs, "   ").is_err());
        assert_eq!(room.topic, "Calculus help");

        let reloaded = PersonalRoom::load(&prefs, "u1", "ada");
        assert_eq!(reloaded, room);
        assert_eq!(
            reloaded.invite_link("https://class.example"),
            "https://class.example/meeting/calc%20room?personal=true"
        );

        let request = reloaded.start_request(now());
        assert_eq!(request.call_id, "calc room");
        assert_eq!(request.custom.topic.as_deref(), Some("Calculus help"));
        assert_eq!(request.custom.creator_id, "u1");
    }

    #[test]
    fn test_schedule_meeting() {
        let prefs = Preferences::in_memory();
        let mut draft = MeetingDraft::new(now() + Duration::hours(2));
        draft.description = "Midterm review".to_string();
        draft.course_id = Some("MATH201".to_string());
        draft.meeting_type = MeetingType::OfficeHours;

        let request =
            schedule_meeting(draft, "prof", now(), &MeetingConfig::default(), &prefs).unwrap();

        assert!(Uuid::parse_str(&request.call_id).is_ok());
        assert_eq!(request.starts_at, now() + Duration::hours(2));
        assert_eq!(
            request.custom.retention_date,
            Some(now() + Duration::days(120))
        );
        assert_eq!(request.custom.meeting_type, Some(MeetingType::OfficeHours));
        assert_eq!(request.custom.is_recording_enabled, Some(true));
        assert_eq!(prefs.topic_for("prof").as_deref(), Some("Midterm review"));

        let json = serde_json::to_value(&request.custom).unwrap();
        assert_eq!(json["meetingType"], "office_hours");
        assert_eq!(json["creatorId"], "prof");
        assert!(json.get("topic").is_none());
    }

    #[test]
    fn test_blank_description_keeps_topic() {
        let prefs = Preferences::in_memory();
        prefs.set_topic("prof", "Old topic").unwrap();

        let first = schedule_meeting(
            MeetingDraft::new(now()),
            "prof",
            now(),
            &MeetingConfig::default(),
            &prefs,
        )
        .unwrap();
        let second = schedule_meeting(
            MeetingDraft::new(now()),
            "prof",
            now(),
            &MeetingConfig::default(),
            &prefs,
        )
        .unwrap();

        assert_eq!(prefs.topic_for("prof").as_deref(), Some("Old topic"));
        assert_ne!(first.call_id, second.call_id);
    }

    #[test]
    fn test_meeting_type_labels() {
        assert_eq!(MeetingType::default().label(), "Lecture");
        assert_eq!(MeetingType::StudyGroup.label(), "Study Group");
    }
}
