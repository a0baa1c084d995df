use serde::Deserialize;

/// Achievement notifications switched off by name.
///
/// Names are matched case-insensitively. An empty list disables nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisabledAchievementNotifications {
    pub levels: Vec<String>,
    pub badges: Vec<String>,
    pub roles: Vec<String>,
}

impl DisabledAchievementNotifications {
    fn contains(list: &[String], name: &str) -> bool {
        let name = name.to_lowercase();
        list.iter().any(|disabled| disabled.to_lowercase() == name)
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Redis connection string
    pub redis_url: String,

    /// Redis list the consumer pops inbound events from
    pub event_queue: String,

    /// Redis list the health probe round-trips synthetic messages through
    pub health_queue: String,

    /// Maximum number of events popped from the queue per batch (default: 100)
    pub consumer_batch_size: usize,

    /// Delay between polls when the event queue is empty (default: 500)
    pub consumer_poll_interval_ms: u64,

    /// Firebase project receiving push messages
    pub fcm_project_id: Option<String>,

    /// OAuth access token for the FCM HTTP v1 API
    pub fcm_access_token: Option<String>,

    /// FCM API base URL (overridable for tests)
    pub fcm_base_url: String,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// Resend API base URL (overridable for tests)
    pub resend_base_url: String,

    /// Maximum entries kept per in-app feed (default: 200)
    pub inapp_feed_max_len: usize,

    /// Prefix prepended to news image paths
    pub picture_base_url: String,

    /// Port the HTTP API listens on (default: 3000)
    pub api_port: u16,

    pub disabled_achievements: DisabledAchievementNotifications,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            event_queue: std::env::var("EVENT_QUEUE")
                .unwrap_or_else(|_| "herald:events".to_string()),
            health_queue: std::env::var("HEALTH_QUEUE")
                .unwrap_or_else(|_| "herald:health".to_string()),
            consumer_batch_size: std::env::var("CONSUMER_BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CONSUMER_BATCH_SIZE must be a valid usize"))?,
            consumer_poll_interval_ms: std::env::var("CONSUMER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CONSUMER_POLL_INTERVAL_MS must be a valid u64"))?,
            fcm_project_id: std::env::var("FCM_PROJECT_ID").ok(),
            fcm_access_token: std::env::var("FCM_ACCESS_TOKEN").ok(),
            fcm_base_url: std::env::var("FCM_BASE_URL")
                .unwrap_or_else(|_| "https://fcm.googleapis.com".to_string()),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            resend_base_url: std::env::var("RESEND_BASE_URL")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),
            inapp_feed_max_len: std::env::var("INAPP_FEED_MAX_LEN")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("INAPP_FEED_MAX_LEN must be a valid usize"))?,
            picture_base_url: std::env::var("PICTURE_BASE_URL").unwrap_or_default(),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
            disabled_achievements: DisabledAchievementNotifications {
                levels: parse_list(std::env::var("DISABLED_LEVEL_NOTIFICATIONS").ok()),
                badges: parse_list(std::env::var("DISABLED_BADGE_NOTIFICATIONS").ok()),
                roles: parse_list(std::env::var("DISABLED_ROLE_NOTIFICATIONS").ok()),
            },
        })
    }

    pub fn is_level_notification_disabled(&self, level_name: &str) -> bool {
        DisabledAchievementNotifications::contains(&self.disabled_achievements.levels, level_name)
    }

    pub fn is_badge_notification_disabled(&self, badge_name: &str) -> bool {
        DisabledAchievementNotifications::contains(&self.disabled_achievements.badges, badge_name)
    }

    pub fn is_role_notification_disabled(&self, role_name: &str) -> bool {
        DisabledAchievementNotifications::contains(&self.disabled_achievements.roles, role_name)
    }
}

/// Split a comma-separated setting, dropping blanks.
fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: 20,
            redis_url: "redis://localhost:6379".to_string(),
            event_queue: "herald:events".to_string(),
            health_queue: "herald:health".to_string(),
            consumer_batch_size: 100,
            consumer_poll_interval_ms: 500,
            fcm_project_id: None,
            fcm_access_token: None,
            fcm_base_url: "https://fcm.googleapis.com".to_string(),
            resend_api_key: None,
            email_from: None,
            resend_base_url: "https://api.resend.com".to_string(),
            inapp_feed_max_len: 200,
            picture_base_url: String::new(),
            api_port: 3000,
            disabled_achievements: DisabledAchievementNotifications::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(badges: &[&str]) -> AppConfig {
        AppConfig {
            disabled_achievements: DisabledAchievementNotifications {
                levels: vec!["Level 5".to_string()],
                badges: badges.iter().map(|b| b.to_string()).collect(),
                roles: vec![],
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_badge_match_is_case_insensitive() {
        let config = config_with(&["Gold"]);
        assert!(config.is_badge_notification_disabled("gold"));
        assert!(config.is_badge_notification_disabled("GOLD"));
        assert!(!config.is_badge_notification_disabled("Silver"));
    }

    #[test]
    fn test_empty_list_disables_nothing() {
        let config = config_with(&[]);
        assert!(!config.is_badge_notification_disabled("gold"));
        assert!(!config.is_role_notification_disabled("ambassador"));
    }

    #[test]
    fn test_level_list_is_independent_of_badges() {
        let config = config_with(&["Gold"]);
        assert!(config.is_level_notification_disabled("level 5"));
        assert!(!config.is_level_notification_disabled("Gold"));
    }

    #[test]
    fn test_parse_list_trims_and_drops_blanks() {
        let parsed = parse_list(Some(" Gold, ,silver ,".to_string()));
        assert_eq!(parsed, vec!["Gold".to_string(), "silver".to_string()]);
        assert!(parse_list(None).is_empty());
    }
}
