//! Inbound decoding: the only place raw user text becomes an `Event`.

use ditchpouch_core::types::{
    AdminCommand, Event, LOG_DOSE_ID, LOG_FAILURE_ID, STRENGTH_ID_PREFIX,
};

use crate::whatsapp::InboundContent;

/// Map inbound content to an engine event.
pub fn decode(content: &InboundContent) -> Event {
    match content {
        InboundContent::Text(text) => decode_text(text),
        InboundContent::ListReply { id, .. } | InboundContent::ButtonReply { id, .. } => {
            decode_reply_id(id)
        }
    }
}

/// Free-text commands. Case and extra whitespace are ignored.
pub fn decode_text(text: &str) -> Event {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let admin = |command| Event::Admin { command };

    match normalized.as_str() {
        "reset me" => admin(AdminCommand::ResetAll),
        "midnight" => Event::DailyTick,
        "three snus" => admin(AdminCommand::ForceLimit(3)),
        "weaker unlock" => admin(AdminCommand::ShowUnlock),
        "graduate me" => admin(AdminCommand::ForceGraduationPreconditions),
        "status" => admin(AdminCommand::QueryStatus),
        "i failed" => Event::LogFailure,
        "start" | "hi" | "hello" => Event::Start,
        other => match parse_mg(other) {
            Some(mg) => Event::LogDose { strength_mg: Some(mg) },
            None => Event::Unrecognized { text: text.to_string() },
        },
    }
}

/// Interactive reply ids produced by our own list and button prompts.
pub fn decode_reply_id(id: &str) -> Event {
    if id == LOG_DOSE_ID {
        return Event::LogDose { strength_mg: None };
    }
    if id == LOG_FAILURE_ID {
        return Event::LogFailure;
    }
    if let Some(mg) = id.strip_prefix(STRENGTH_ID_PREFIX).and_then(|s| s.parse().ok()) {
        return Event::SelectStrength { mg };
    }
    Event::Unrecognized { text: id.to_string() }
}

/// `"20"`, `"20mg"`, `"20 mg"`.
fn parse_mg(text: &str) -> Option<u32> {
    let digits = text.strip_suffix("mg").unwrap_or(text).trim();
    digits.parse().ok().filter(|mg| *mg > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Event {
        decode(&InboundContent::Text(s.into()))
    }

    #[test]
    fn test_admin_phrases() {
        assert_eq!(text("Reset me"), Event::Admin { command: AdminCommand::ResetAll });
        assert_eq!(text("  MIDNIGHT "), Event::DailyTick);
        assert_eq!(text("three  snus"), Event::Admin { command: AdminCommand::ForceLimit(3) });
        assert_eq!(text("weaker unlock"), Event::Admin { command: AdminCommand::ShowUnlock });
        assert_eq!(
            text("graduate me"),
            Event::Admin { command: AdminCommand::ForceGraduationPreconditions }
        );
        assert_eq!(text("Status"), Event::Admin { command: AdminCommand::QueryStatus });
    }

    #[test]
    fn test_user_phrases() {
        assert_eq!(text("I failed"), Event::LogFailure);
        assert_eq!(text("hi"), Event::Start);
        assert_eq!(text("20"), Event::LogDose { strength_mg: Some(20) });
        assert_eq!(text("15mg"), Event::LogDose { strength_mg: Some(15) });
        assert_eq!(text("5 MG"), Event::LogDose { strength_mg: Some(5) });
    }

    #[test]
    fn test_unrecognized_keeps_original_text() {
        assert_eq!(text("Hello there"), Event::Unrecognized { text: "Hello there".into() });
        assert_eq!(text("0"), Event::Unrecognized { text: "0".into() });
        assert_eq!(text("-5"), Event::Unrecognized { text: "-5".into() });
    }

    #[test]
    fn test_reply_ids() {
        let list = InboundContent::ListReply { id: "strength_25".into(), title: "25mg".into() };
        assert_eq!(decode(&list), Event::SelectStrength { mg: 25 });

        let dose = InboundContent::ButtonReply { id: "log_dose".into(), title: "Took a snus".into() };
        assert_eq!(decode(&dose), Event::LogDose { strength_mg: None });

        let failed = InboundContent::ButtonReply { id: "log_failure".into(), title: "I failed".into() };
        assert_eq!(decode(&failed), Event::LogFailure);

        let junk = InboundContent::ListReply { id: "strength_x".into(), title: String::new() };
        assert!(matches!(decode(&junk), Event::Unrecognized { .. }));
    }
}
