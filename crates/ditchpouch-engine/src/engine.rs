//! Progress engine: the tapering and graduation transition function.
//!
//! `transition` is pure: the same state and event always produce the same
//! new state and outbound list. Bad input never fails; it leaves the state
//! untouched and answers with an advisory.

use ditchpouch_core::config::TrackerConfig;
use ditchpouch_core::types::{AdminCommand, Event, Outbound, UserProgress};

use crate::ladder;
use crate::messages;

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: UserProgress,
    pub outbound: Vec<Outbound>,
}

impl Transition {
    fn new(state: UserProgress, outbound: Vec<Outbound>) -> Self {
        Self { state, outbound }
    }

    /// State unchanged, one advisory.
    fn advise(state: UserProgress, text: impl Into<String>) -> Self {
        Self::new(state, vec![messages::advisory(text)])
    }
}

/// The state machine, parameterized by the tapering policy.
#[derive(Debug, Clone)]
pub struct Engine {
    policy: TrackerConfig,
}

impl Engine {
    pub fn new(policy: TrackerConfig) -> Self {
        Self { policy }
    }

    /// What `ResetAll` and a first load produce.
    pub fn initial_state(&self) -> UserProgress {
        self.policy.initial_progress()
    }

    /// Apply one event.
    pub fn transition(&self, state: UserProgress, event: Event) -> Transition {
        if state.graduated {
            return self.graduated(state, event);
        }
        match event {
            Event::Start => self.start(state),
            Event::SelectStrength { mg } => self.select_strength(state, mg),
            Event::LogDose { strength_mg } => self.log_dose(state, strength_mg),
            Event::LogFailure => self.log_failure(state),
            Event::DailyTick => self.daily_tick(state),
            Event::Admin { command } => self.admin(state, command),
            Event::Unrecognized { text } => {
                tracing::debug!("Unrecognized input: {text}");
                Transition::new(state, vec![messages::advisory(messages::USAGE)])
            }
        }
    }

    /// Graduated profiles are frozen; only reset and status get through. A
    /// lapse report gets support but no longer touches the record.
    fn graduated(&self, state: UserProgress, event: Event) -> Transition {
        match event {
            Event::Admin { command: AdminCommand::ResetAll } => self.reset(),
            Event::Admin { command: AdminCommand::QueryStatus } => self.status(state),
            Event::LogFailure => Transition::new(state, vec![messages::graduated_lapse()]),
            Event::DailyTick => Transition::new(state, Vec::new()),
            _ => Transition::new(state, vec![messages::already_graduated()]),
        }
    }

    fn start(&self, state: UserProgress) -> Transition {
        let tiers = ladder::selectable(&self.policy.ladder, state.current_strength_mg);
        let prompt = match state.current_strength_mg {
            Some(mg) => format!("👋 You're on {mg}mg. Pick your current strength:"),
            None => "👋 Welcome! Which snus strength are you using right now?".to_string(),
        };
        Transition::new(state, vec![messages::strength_list(prompt, &tiers)])
    }

    fn select_strength(&self, mut state: UserProgress, mg: u32) -> Transition {
        if !ladder::contains(&self.policy.ladder, mg) {
            return Transition::advise(
                state,
                format!("{mg}mg isn't one of the strengths I track. Pick one from the list."),
            );
        }
        if let Some(current) = state.current_strength_mg {
            if mg > current {
                return Transition::advise(
                    state,
                    format!("You're already down to {current}mg. Pick {current}mg or something weaker."),
                );
            }
        }

        let first = state.initial_strength_mg.is_none();
        state.current_strength_mg = Some(mg);
        if first {
            state.initial_strength_mg = Some(mg);
        }
        Transition::new(
            state,
            vec![messages::strength_selected(mg, first), messages::log_dose_prompt()],
        )
    }

    fn log_dose(&self, mut state: UserProgress, strength_mg: Option<u32>) -> Transition {
        if let Some(mg) = strength_mg {
            if !ladder::contains(&self.policy.ladder, mg) {
                return Transition::advise(
                    state,
                    format!("{mg}mg isn't a strength I know. Reply with your snus strength, e.g. '20', or say 'I failed'."),
                );
            }
        }

        if let Some(limit) = state.daily_limit.filter(|_| state.at_limit()) {
            state.failed_today = true;
            return Transition::new(state, vec![messages::limit_exceeded(limit)]);
        }

        let strength = strength_mg.or(state.current_strength_mg);
        state.doses_today += 1;
        if let Some(mg) = strength {
            state.logged_strengths.push(mg);
        }
        let confirmation = messages::dose_logged(&state, strength);
        Transition::new(state, vec![confirmation])
    }

    fn log_failure(&self, mut state: UserProgress) -> Transition {
        state.failed_today = true;
        Transition::new(state, vec![messages::failure_support()])
    }

    /// The daily boundary: streak, graduation, ratchet, unlock, reset.
    fn daily_tick(&self, mut state: UserProgress) -> Transition {
        let mut outbound = Vec::new();

        if state.zero_dose_at_target() {
            state.zero_dose_streak += 1;
        } else {
            state.zero_dose_streak = 0;
        }

        if state.zero_dose_streak >= self.policy.graduation_streak {
            state.graduated = true;
            outbound.push(messages::graduated(state.zero_dose_streak, state.target_mg));
            reset_day(&mut state);
            return Transition::new(state, outbound);
        }

        // The ratchet needs one complete day on record; the first boundary
        // only snapshots.
        let previous = state.yesterday_total;
        let yesterday = state.doses_today;
        state.yesterday_total = Some(yesterday);
        if previous.is_some() {
            let limit = yesterday.saturating_sub(1).max(state.min_limit);
            state.daily_limit = Some(limit);

            if limit == state.min_limit {
                if let Some(current) = state.current_strength_mg.filter(|mg| *mg > state.target_mg) {
                    let tiers = ladder::weaker_options(
                        &self.policy.ladder,
                        current,
                        &self.policy.unlock_policy,
                    );
                    if !tiers.is_empty() {
                        outbound.push(messages::unlock_prompt(state.min_limit, &tiers));
                    }
                }
            }
        }

        reset_day(&mut state);
        outbound.push(messages::daily_summary(&state, yesterday));
        Transition::new(state, outbound)
    }

    fn admin(&self, mut state: UserProgress, command: AdminCommand) -> Transition {
        match command {
            AdminCommand::ResetAll => self.reset(),
            AdminCommand::ForceLimit(limit) => {
                let floor = state.min_limit;
                if limit < floor {
                    return Transition::advise(state, format!("The daily limit can't go below {floor}."));
                }
                state.daily_limit = Some(limit);
                Transition::new(state, vec![Outbound::text(format!("🛠️ Daily limit set to {limit}."))])
            }
            AdminCommand::ForceGraduationPreconditions => {
                state.current_strength_mg = Some(state.target_mg);
                state.doses_today = 0;
                state.logged_strengths.clear();
                state.zero_dose_streak = self.policy.graduation_streak.saturating_sub(1);
                let body = format!(
                    "🛠️ Set to {}mg with a {}-day zero-dose streak. One more zero-dose day graduates.",
                    state.target_mg, state.zero_dose_streak
                );
                Transition::new(state, vec![Outbound::text(body)])
            }
            AdminCommand::ShowUnlock => {
                let tiers = state
                    .current_strength_mg
                    .map(|current| {
                        ladder::weaker_options(&self.policy.ladder, current, &self.policy.unlock_policy)
                    })
                    .unwrap_or_default();
                if tiers.is_empty() {
                    return Transition::advise(state, "There's no weaker strength to unlock right now.");
                }
                let prompt = messages::unlock_prompt(state.min_limit, &tiers);
                Transition::new(state, vec![prompt])
            }
            AdminCommand::QueryStatus => self.status(state),
        }
    }

    fn reset(&self) -> Transition {
        let state = self.initial_state();
        let tiers = ladder::selectable(&self.policy.ladder, None);
        Transition::new(
            state,
            vec![
                Outbound::text("🔄 Progress reset. Starting fresh."),
                messages::strength_list("Which snus strength are you using right now?", &tiers),
            ],
        )
    }

    fn status(&self, state: UserProgress) -> Transition {
        let snapshot = messages::status(&state, self.policy.graduation_streak);
        Transition::new(state, vec![snapshot])
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

fn reset_day(state: &mut UserProgress) {
    state.doses_today = 0;
    state.logged_strengths.clear();
    state.failed_today = false;
}
