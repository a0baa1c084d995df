use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery channel a notification can go out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum Channel {
    Push,
    Email,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => "push",
            Channel::Email => "email",
            Channel::InApp => "in_app",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of notification, persisted in the ledger's `notification_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum NotificationType {
    Welcome,
    DailyBonus,
    Ping,
    DaysOffStarted,
    BadgeUnlocked,
    LevelCompleted,
    RoleChanged,
    ContactJoined,
    NewsAdded,
    AdoptionChanged,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Welcome => "welcome",
            NotificationType::DailyBonus => "daily_bonus",
            NotificationType::Ping => "ping",
            NotificationType::DaysOffStarted => "days_off_started",
            NotificationType::BadgeUnlocked => "badge_unlocked",
            NotificationType::LevelCompleted => "level_completed",
            NotificationType::RoleChanged => "role_changed",
            NotificationType::ContactJoined => "contact_joined",
            NotificationType::NewsAdded => "news_added",
            NotificationType::AdoptionChanged => "adoption_changed",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a notification is addressed to.
///
/// Personal notifications are deduplicated per recipient; announcements are
/// deduplicated once for everybody.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    Personal { user_id: String },
    Broadcast,
}

impl Scope {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Scope::Personal { user_id } => Some(user_id),
            Scope::Broadcast => None,
        }
    }
}

/// Localized content ready to hand to a channel sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPayload {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<String>,
    pub data: serde_json::Value,
}

/// One channel attempt of an intent: where to send and what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub channel: Channel,
    /// Device token, push topic, email address or in-app feed, depending on the channel.
    pub destination: String,
    pub payload: RenderedPayload,
}

/// A decision to notify, produced by an event handler and consumed once by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub scope: Scope,
    pub language: String,
    pub notification_type: NotificationType,
    /// Business key making the notification unique, e.g. `badge:gold` or `day-off:3`.
    pub uniqueness: String,
    pub deliveries: Vec<Delivery>,
}

/// Composite key of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentRecordKey {
    /// `None` for announcements.
    pub user_id: Option<String>,
    pub uniqueness: String,
    pub notification_type: NotificationType,
    pub channel: Channel,
    pub channel_value: String,
}

/// A ledger row: its existence means the notification was delivered and must not be resent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentRecord {
    pub key: SentRecordKey,
    pub language: String,
    pub sent_at: DateTime<Utc>,
}

impl SentRecord {
    pub fn for_delivery(
        intent: &NotificationIntent,
        delivery: &Delivery,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: SentRecordKey {
                user_id: intent.scope.user_id().map(str::to_string),
                uniqueness: intent.uniqueness.clone(),
                notification_type: intent.notification_type,
                channel: delivery.channel,
                channel_value: delivery.destination.clone(),
            },
            language: intent.language.clone(),
            sent_at,
        }
    }

    pub fn is_announcement(&self) -> bool {
        self.key.user_id.is_none()
    }
}

// ============================================================
// Inbound events
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRegistered {
    pub user_id: String,
    pub device_id: String,
    pub push_token: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBonusAvailable {
    pub user_id: String,
    pub bonus_index: u64,
    pub amount: f64,
    pub available_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingDue {
    pub user_id: String,
    /// Username of the user who pinged.
    pub pinged_by: String,
    pub pinged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaysOffStarted {
    pub user_id: String,
    pub day_off_number: u32,
    pub remaining: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeAchieved {
    pub user_id: String,
    pub badge: String,
    pub group: String,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCompleted {
    pub user_id: String,
    pub level: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleEnabled {
    pub user_id: String,
    pub role: String,
    pub enabled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaContactAdded {
    /// User whose agenda contains the newcomer.
    pub user_id: String,
    pub contact_user_id: String,
    pub contact_username: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsPublished {
    pub news_id: String,
    pub language: String,
    pub title: String,
    pub news_type: NewsType,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionChanged {
    pub milestone: u64,
    pub base_mining_rate: f64,
    pub changed_at: DateTime<Utc>,
}

/// An inbound domain event, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    UserCreated(UserCreated),
    DeviceRegistered(DeviceRegistered),
    DailyBonusAvailable(DailyBonusAvailable),
    PingDue(PingDue),
    DaysOffStarted(DaysOffStarted),
    BadgeAchieved(BadgeAchieved),
    LevelCompleted(LevelCompleted),
    RoleEnabled(RoleEnabled),
    AgendaContactAdded(AgendaContactAdded),
    NewsPublished(NewsPublished),
    AdoptionChanged(AdoptionChanged),
}

/// Discriminator of [`Event`], used as the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserCreated,
    DeviceRegistered,
    DailyBonusAvailable,
    PingDue,
    DaysOffStarted,
    BadgeAchieved,
    LevelCompleted,
    RoleEnabled,
    AgendaContactAdded,
    NewsPublished,
    AdoptionChanged,
}

impl EventKind {
    /// Every event kind the consumer must be able to route.
    pub const ALL: [EventKind; 11] = [
        EventKind::UserCreated,
        EventKind::DeviceRegistered,
        EventKind::DailyBonusAvailable,
        EventKind::PingDue,
        EventKind::DaysOffStarted,
        EventKind::BadgeAchieved,
        EventKind::LevelCompleted,
        EventKind::RoleEnabled,
        EventKind::AgendaContactAdded,
        EventKind::NewsPublished,
        EventKind::AdoptionChanged,
    ];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::UserCreated => write!(f, "user_created"),
            EventKind::DeviceRegistered => write!(f, "device_registered"),
            EventKind::DailyBonusAvailable => write!(f, "daily_bonus_available"),
            EventKind::PingDue => write!(f, "ping_due"),
            EventKind::DaysOffStarted => write!(f, "days_off_started"),
            EventKind::BadgeAchieved => write!(f, "badge_achieved"),
            EventKind::LevelCompleted => write!(f, "level_completed"),
            EventKind::RoleEnabled => write!(f, "role_enabled"),
            EventKind::AgendaContactAdded => write!(f, "agenda_contact_added"),
            EventKind::NewsPublished => write!(f, "news_published"),
            EventKind::AdoptionChanged => write!(f, "adoption_changed"),
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::UserCreated(_) => EventKind::UserCreated,
            Event::DeviceRegistered(_) => EventKind::DeviceRegistered,
            Event::DailyBonusAvailable(_) => EventKind::DailyBonusAvailable,
            Event::PingDue(_) => EventKind::PingDue,
            Event::DaysOffStarted(_) => EventKind::DaysOffStarted,
            Event::BadgeAchieved(_) => EventKind::BadgeAchieved,
            Event::LevelCompleted(_) => EventKind::LevelCompleted,
            Event::RoleEnabled(_) => EventKind::RoleEnabled,
            Event::AgendaContactAdded(_) => EventKind::AgendaContactAdded,
            Event::NewsPublished(_) => EventKind::NewsPublished,
            Event::AdoptionChanged(_) => EventKind::AdoptionChanged,
        }
    }

    /// Recipient of the event, `None` for broadcast events.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Event::UserCreated(e) => Some(&e.user_id),
            Event::DeviceRegistered(e) => Some(&e.user_id),
            Event::DailyBonusAvailable(e) => Some(&e.user_id),
            Event::PingDue(e) => Some(&e.user_id),
            Event::DaysOffStarted(e) => Some(&e.user_id),
            Event::BadgeAchieved(e) => Some(&e.user_id),
            Event::LevelCompleted(e) => Some(&e.user_id),
            Event::RoleEnabled(e) => Some(&e.user_id),
            Event::AgendaContactAdded(e) => Some(&e.user_id),
            Event::NewsPublished(_) | Event::AdoptionChanged(_) => None,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Event::UserCreated(e) => e.created_at,
            Event::DeviceRegistered(e) => e.registered_at,
            Event::DailyBonusAvailable(e) => e.available_at,
            Event::PingDue(e) => e.pinged_at,
            Event::DaysOffStarted(e) => e.started_at,
            Event::BadgeAchieved(e) => e.achieved_at,
            Event::LevelCompleted(e) => e.completed_at,
            Event::RoleEnabled(e) => e.enabled_at,
            Event::AgendaContactAdded(e) => e.added_at,
            Event::NewsPublished(e) => e.published_at,
            Event::AdoptionChanged(e) => e.changed_at,
        }
    }
}

// ============================================================
// Recipients and news
// ============================================================

/// What the notifier knows about a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientProfile {
    pub user_id: String,
    pub username: String,
    pub language: String,
    pub email: Option<String>,
    pub push_tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum NewsType {
    Regular,
    Featured,
}

impl NewsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsType::Regular => "regular",
            NewsType::Featured => "featured",
        }
    }
}

impl std::str::FromStr for NewsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(NewsType::Regular),
            "featured" => Ok(NewsType::Featured),
            other => Err(format!("unknown news type '{other}'")),
        }
    }
}

/// A news article as seen by one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalNews {
    pub viewed: Option<bool>,
    pub id: String,
    pub language: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub news_type: String,
    pub title: String,
    pub image_url: String,
    pub url: String,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnreadNewsCount {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_from_tagged_json() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "type": "badge_achieved",
            "user_id": "u-1",
            "badge": "Gold",
            "group": "social",
            "achieved_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::BadgeAchieved);
        assert_eq!(event.user_id(), Some("u-1"));
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let result: Result<Event, _> = serde_json::from_value(serde_json::json!({
            "type": "user_deleted",
            "user_id": "u-1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_broadcast_events_have_no_recipient() {
        let event = Event::AdoptionChanged(AdoptionChanged {
            milestone: 3,
            base_mining_rate: 8.0,
            changed_at: Utc::now(),
        });
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_event_kind_display_matches_wire_tag() {
        for kind in EventKind::ALL {
            let tag = serde_json::to_value(kind).unwrap();
            assert_eq!(tag.as_str().unwrap(), kind.to_string());
        }
    }

    #[test]
    fn test_sent_record_key_drops_recipient_for_announcements() {
        let payload = RenderedPayload {
            title: "t".to_string(),
            body: "b".to_string(),
            image_url: None,
            deeplink: None,
            data: serde_json::json!({}),
        };
        let delivery = Delivery {
            channel: Channel::Push,
            destination: "topic:news_en".to_string(),
            payload,
        };
        let intent = NotificationIntent {
            scope: Scope::Broadcast,
            language: "en".to_string(),
            notification_type: NotificationType::NewsAdded,
            uniqueness: "news:1".to_string(),
            deliveries: vec![delivery.clone()],
        };

        let record = SentRecord::for_delivery(&intent, &delivery, Utc::now());
        assert!(record.is_announcement());
        assert_eq!(record.key.channel_value, "topic:news_en");
    }
}
