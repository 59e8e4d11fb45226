//! Progress record, inbound events and outbound intents.

use serde::{Deserialize, Serialize};

/// Floor the daily limit never goes below.
pub const DEFAULT_MIN_LIMIT: u32 = 3;
/// Strength tier considered graduation-eligible.
pub const DEFAULT_TARGET_MG: u32 = 3;

/// Reply id of the "took a snus" button.
pub const LOG_DOSE_ID: &str = "log_dose";
/// Reply id of the "I failed" button.
pub const LOG_FAILURE_ID: &str = "log_failure";
/// Prefix of strength list row ids (`strength_20`).
pub const STRENGTH_ID_PREFIX: &str = "strength_";

/// List row id for a strength tier.
pub fn strength_choice_id(mg: u32) -> String {
    format!("{STRENGTH_ID_PREFIX}{mg}")
}

/// The single tracked profile.
///
/// Field names mirror the persisted record one-to-one. Unknown or missing
/// fields are rejected on load so a damaged record never silently turns into
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserProgress {
    /// Active strength tier, unset until the first selection.
    pub current_strength_mg: Option<u32>,
    /// Strength at the first selection. Only `ResetAll` clears it.
    pub initial_strength_mg: Option<u32>,
    /// Doses logged since the last daily boundary.
    pub doses_today: u32,
    /// Strength logged with each of today's doses, when known.
    pub logged_strengths: Vec<u32>,
    /// `doses_today` snapshot taken at the last boundary.
    pub yesterday_total: Option<u32>,
    /// Ceiling for the current day.
    pub daily_limit: Option<u32>,
    pub min_limit: u32,
    pub target_mg: u32,
    pub failed_today: bool,
    /// Consecutive boundaries at target strength with zero doses.
    pub zero_dose_streak: u32,
    pub graduated: bool,
}

impl UserProgress {
    /// Fresh profile with the given floor and target.
    pub fn new(min_limit: u32, target_mg: u32) -> Self {
        Self {
            current_strength_mg: None,
            initial_strength_mg: None,
            doses_today: 0,
            logged_strengths: Vec::new(),
            yesterday_total: None,
            daily_limit: None,
            min_limit,
            target_mg,
            failed_today: false,
            zero_dose_streak: 0,
            graduated: false,
        }
    }

    /// True when `LogDose` would be rejected.
    pub fn at_limit(&self) -> bool {
        self.daily_limit.is_some_and(|limit| self.doses_today >= limit)
    }

    /// Zero doses today at the target strength.
    pub fn zero_dose_at_target(&self) -> bool {
        self.current_strength_mg == Some(self.target_mg) && self.doses_today == 0
    }
}

impl Default for UserProgress {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LIMIT, DEFAULT_TARGET_MG)
    }
}

/// Which ladder entries a "choose a weaker strength" prompt offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "mg", rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// Every ladder entry strictly below the current strength.
    AllBelow,
    /// Only the next ladder entry below the current strength.
    NextTier,
    /// A fixed candidate list, filtered to entries below the current strength.
    Candidates(Vec<u32>),
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self::AllBelow
    }
}

/// Diagnostic commands that manipulate the same state as the habit loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum AdminCommand {
    ResetAll,
    ForceLimit(u32),
    ForceGraduationPreconditions,
    /// Offer the weaker-strength list now instead of waiting for the floor.
    ShowUnlock,
    QueryStatus,
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// First contact or an explicit greeting.
    Start,
    SelectStrength { mg: u32 },
    LogDose { strength_mg: Option<u32> },
    LogFailure,
    DailyTick,
    Admin { command: AdminCommand },
    /// Text the decoder could not map to any command.
    Unrecognized { text: String },
}

impl Event {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::SelectStrength { .. } => "select_strength",
            Event::LogDose { .. } => "log_dose",
            Event::LogFailure => "log_failure",
            Event::DailyTick => "daily_tick",
            Event::Admin { .. } => "admin",
            Event::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// One selectable option in a list or button prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A message the transport should deliver to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    PlainText { body: String },
    ChoiceList { prompt: String, options: Vec<Choice> },
    ButtonPrompt { prompt: String, buttons: Vec<Choice> },
}

impl Outbound {
    pub fn text(body: impl Into<String>) -> Self {
        Outbound::PlainText { body: body.into() }
    }

    /// The human-readable part of the message.
    pub fn body(&self) -> &str {
        match self {
            Outbound::PlainText { body } => body,
            Outbound::ChoiceList { prompt, .. } | Outbound::ButtonPrompt { prompt, .. } => prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_uses_record_field_names() {
        let progress = UserProgress::default();
        let json = serde_json::to_value(&progress).unwrap();
        assert!(json.get("currentStrengthMg").is_some());
        assert!(json.get("zeroDoseStreak").is_some());
        let back: UserProgress = serde_json::from_value(json).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn test_rejects_unknown_and_missing_fields() {
        let mut json = serde_json::to_value(UserProgress::default()).unwrap();
        json["mood"] = serde_json::json!("great");
        assert!(serde_json::from_value::<UserProgress>(json).is_err());

        let mut json = serde_json::to_value(UserProgress::default()).unwrap();
        json.as_object_mut().unwrap().remove("graduated");
        assert!(serde_json::from_value::<UserProgress>(json).is_err());
    }

    #[test]
    fn test_at_limit() {
        let mut progress = UserProgress::default();
        progress.doses_today = 10;
        assert!(!progress.at_limit());
        progress.daily_limit = Some(5);
        assert!(progress.at_limit());
        progress.doses_today = 4;
        assert!(!progress.at_limit());
    }

    #[test]
    fn test_unlock_policy_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            unlock_policy: UnlockPolicy,
        }
        let w: Wrapper = toml::from_str("unlock_policy = { kind = \"candidates\", mg = [15, 10, 5] }").unwrap();
        assert_eq!(w.unlock_policy, UnlockPolicy::Candidates(vec![15, 10, 5]));
        let w: Wrapper = toml::from_str("unlock_policy = { kind = \"next_tier\" }").unwrap();
        assert_eq!(w.unlock_policy, UnlockPolicy::NextTier);
    }
}
