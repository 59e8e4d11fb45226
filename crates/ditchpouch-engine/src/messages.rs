//! User-facing message text and prompt builders.

use ditchpouch_core::types::{Choice, LOG_DOSE_ID, LOG_FAILURE_ID, Outbound, UserProgress};

use crate::ladder;

pub const USAGE: &str = "Press the button each time you take a snus, or reply with its strength (e.g. '20'). \
Say 'I failed' if you slip up, or 'status' to see where you are.";

/// The "took a snus / I failed" buttons.
pub fn dose_buttons() -> Vec<Choice> {
    vec![
        Choice::new(LOG_DOSE_ID, "Took a snus"),
        Choice::new(LOG_FAILURE_ID, "I failed"),
    ]
}

pub fn log_dose_prompt() -> Outbound {
    Outbound::ButtonPrompt {
        prompt: "Please press the button when you have taken a snus.".into(),
        buttons: dose_buttons(),
    }
}

pub fn strength_list(prompt: impl Into<String>, tiers: &[u32]) -> Outbound {
    Outbound::ChoiceList {
        prompt: prompt.into(),
        options: ladder::choices(tiers),
    }
}

pub fn strength_selected(mg: u32, first: bool) -> Outbound {
    if first {
        Outbound::text(format!("👍 Got it, you're starting at {mg}mg. Let's bring it down together."))
    } else {
        Outbound::text(format!("👍 Strength set to {mg}mg."))
    }
}

pub fn dose_logged(progress: &UserProgress, strength_mg: Option<u32>) -> Outbound {
    let strength = strength_mg.map(|mg| format!(" {mg}mg")).unwrap_or_default();
    let limit = match progress.daily_limit {
        Some(limit) => format!(" (limit {limit})"),
        None => String::new(),
    };
    Outbound::ButtonPrompt {
        prompt: format!(
            "✅ Logged{strength}. You've taken {} snus today{limit}.",
            progress.doses_today
        ),
        buttons: dose_buttons(),
    }
}

pub fn limit_exceeded(limit: u32) -> Outbound {
    Outbound::text(format!(
        "🚫 You've reached today's limit of {limit}. That one counts as a slip. Hold off until tomorrow, you can do it."
    ))
}

pub fn failure_support() -> Outbound {
    Outbound::text("Don't worry, setbacks happen. Tomorrow is a new day!")
}

pub fn daily_summary(progress: &UserProgress, yesterday: u32) -> Outbound {
    let mut body = format!("🌅 New day! Yesterday you took {yesterday} snus.");
    match progress.daily_limit {
        Some(limit) => body.push_str(&format!(" Your limit for today is {limit}.")),
        None => body.push_str(" Your daily limit starts after your first full day of tracking."),
    }
    if progress
        .current_strength_mg
        .is_some_and(|mg| mg <= progress.target_mg)
    {
        body.push_str(&format!(
            " You've worked down to {}mg snus or below. You're nearly done! Keep it up 💪",
            progress.target_mg
        ));
    }
    Outbound::text(body)
}

pub fn unlock_prompt(min_limit: u32, tiers: &[u32]) -> Outbound {
    strength_list(
        format!(
            "🔓 You have worked down to {min_limit} snus per day, great job! You have unlocked weaker snus. Pick your new strength:"
        ),
        tiers,
    )
}

pub fn graduated(streak: u32, target_mg: u32) -> Outbound {
    Outbound::text(format!(
        "🎓 {streak} days in a row with zero snus at {target_mg}mg. You've graduated, you're free of the pouch! \
Reply 'reset me' if you ever want to start again."
    ))
}

pub fn graduated_lapse() -> Outbound {
    Outbound::text(
        "💪 One slip doesn't undo what you achieved. If you want to taper again, reply 'reset me' to start over.",
    )
}

pub fn already_graduated() -> Outbound {
    Outbound::text("🎓 You've already graduated, there's nothing left to track. Reply 'reset me' to start over.")
}

pub fn status(progress: &UserProgress, graduation_streak: u32) -> Outbound {
    let mg = |v: Option<u32>| v.map(|mg| format!("{mg}mg")).unwrap_or_else(|| "not set".into());
    let limit = progress
        .daily_limit
        .map(|l| l.to_string())
        .unwrap_or_else(|| "none yet".into());
    let yesterday = progress
        .yesterday_total
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".into());
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    Outbound::text(format!(
        "📊 Status\n\
Strength: {} (started at {})\n\
Today: {} snus (limit {limit})\n\
Yesterday: {yesterday}\n\
Failed today: {}\n\
Zero-dose streak: {}/{graduation_streak}\n\
Graduated: {}",
        mg(progress.current_strength_mg),
        mg(progress.initial_strength_mg),
        progress.doses_today,
        yes_no(progress.failed_today),
        progress.zero_dose_streak,
        yes_no(progress.graduated),
    ))
}

pub fn advisory(text: impl Into<String>) -> Outbound {
    Outbound::text(format!("⚠️ {}", text.into()))
}
