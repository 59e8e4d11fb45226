//! Single-actor tracker: one `load → transition → save → send` cycle at a
//! time, shared by the webhook handlers and the daily boundary.

use std::sync::Arc;

use chrono::NaiveDate;
use ditchpouch_core::error::Result;
use ditchpouch_core::traits::{Channel, ProgressStore};
use ditchpouch_core::types::{Event, Outbound, UserProgress};
use tokio::sync::Mutex;

use crate::engine::{Engine, Transition};

pub struct Tracker {
    engine: Engine,
    store: Arc<dyn ProgressStore>,
    channel: Arc<dyn Channel>,
    /// Held for the whole cycle, including dispatch.
    cycle: Mutex<()>,
}

impl Tracker {
    pub fn new(engine: Engine, store: Arc<dyn ProgressStore>, channel: Arc<dyn Channel>) -> Self {
        tracing::info!(
            "📈 Tracker ready (store={}, channel={})",
            store.name(),
            channel.name()
        );
        Self {
            engine,
            store,
            channel,
            cycle: Mutex::new(()),
        }
    }

    /// Process one event to completion and return what was sent.
    ///
    /// The new state is saved before anything is sent, so a failed send
    /// never loses or corrupts progress. A store failure aborts the cycle
    /// with nothing sent.
    pub async fn handle(&self, event: Event) -> Result<Vec<Outbound>> {
        let _cycle = self.cycle.lock().await;
        self.run(event, None).await
    }

    /// Apply the scheduled boundary for the local date `day`.
    ///
    /// Runs a `DailyTick` unless `day` (or a later one) is already recorded,
    /// then records `day` after the progress is saved.
    pub async fn close_day(&self, day: NaiveDate) -> Result<Vec<Outbound>> {
        let _cycle = self.cycle.lock().await;
        if let Some(last) = self.store.last_boundary()? {
            if last >= day {
                tracing::debug!("Boundary for {day} already applied (last {last}), skipping");
                return Ok(Vec::new());
            }
        }
        self.run(Event::DailyTick, Some(day)).await
    }

    /// Date of the last boundary applied.
    pub async fn last_boundary(&self) -> Result<Option<NaiveDate>> {
        let _cycle = self.cycle.lock().await;
        self.store.last_boundary()
    }

    /// Mark `day` as applied without ticking.
    pub async fn record_boundary(&self, day: NaiveDate) -> Result<()> {
        let _cycle = self.cycle.lock().await;
        self.store.record_boundary(day)
    }

    async fn run(&self, event: Event, boundary: Option<NaiveDate>) -> Result<Vec<Outbound>> {
        let kind = event.kind();

        let before = self.store.load(&self.engine.initial_state())?;
        let Transition { state, outbound } = self.engine.transition(before.clone(), event);

        if state != before {
            self.store.save(&state)?;
        }
        if let Some(day) = boundary {
            self.store.record_boundary(day)?;
        }
        tracing::info!(
            "🧾 {kind}: doses={} limit={:?} streak={} graduated={} → {} message(s)",
            state.doses_today,
            state.daily_limit,
            state.zero_dose_streak,
            state.graduated,
            outbound.len()
        );

        for message in &outbound {
            if let Err(e) = self.channel.send(message).await {
                tracing::warn!("⚠️ Failed to deliver {kind} reply via {}: {e}", self.channel.name());
            }
        }

        Ok(outbound)
    }

    /// Current persisted progress.
    pub async fn snapshot(&self) -> Result<UserProgress> {
        let _cycle = self.cycle.lock().await;
        self.store.load(&self.engine.initial_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ditchpouch_core::error::DitchPouchError;
    use ditchpouch_core::types::AdminCommand;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MemStore {
        record: StdMutex<Option<UserProgress>>,
        boundary: StdMutex<Option<NaiveDate>>,
        saves: StdMutex<usize>,
        fail_save: bool,
    }

    impl ProgressStore for MemStore {
        fn name(&self) -> &str {
            "test-memory"
        }

        fn load(&self, defaults: &UserProgress) -> Result<UserProgress> {
            Ok(self.record.lock().unwrap().clone().unwrap_or_else(|| defaults.clone()))
        }

        fn save(&self, progress: &UserProgress) -> Result<()> {
            if self.fail_save {
                return Err(DitchPouchError::Store("disk full".into()));
            }
            *self.record.lock().unwrap() = Some(progress.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        fn last_boundary(&self) -> Result<Option<NaiveDate>> {
            Ok(*self.boundary.lock().unwrap())
        }

        fn record_boundary(&self, day: NaiveDate) -> Result<()> {
            if self.fail_save {
                return Err(DitchPouchError::Store("disk full".into()));
            }
            *self.boundary.lock().unwrap() = Some(day);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: StdMutex<Vec<Outbound>>,
        fail: bool,
    }

    #[async_trait]
    impl Channel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, message: &Outbound) -> Result<()> {
            if self.fail {
                return Err(DitchPouchError::Channel("offline".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn tracker(store: Arc<MemStore>, channel: Arc<Recorder>) -> Tracker {
        Tracker::new(Engine::default(), store, channel)
    }

    #[tokio::test]
    async fn test_handle_persists_then_sends() {
        let store = Arc::new(MemStore::default());
        let channel = Arc::new(Recorder::default());
        let t = tracker(store.clone(), channel.clone());

        let out = t.handle(Event::SelectStrength { mg: 20 }).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(channel.sent.lock().unwrap().len(), 2);
        let saved = store.record.lock().unwrap().clone().unwrap();
        assert_eq!(saved.current_strength_mg, Some(20));
    }

    #[tokio::test]
    async fn test_read_only_event_skips_save() {
        let store = Arc::new(MemStore::default());
        let t = tracker(store.clone(), Arc::new(Recorder::default()));
        t.handle(Event::Admin { command: AdminCommand::QueryStatus }).await.unwrap();
        assert_eq!(*store.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_keeps_state() {
        let store = Arc::new(MemStore::default());
        let channel = Arc::new(Recorder { fail: true, ..Default::default() });
        let t = tracker(store.clone(), channel);

        let out = t.handle(Event::LogDose { strength_mg: None }).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(t.snapshot().await.unwrap().doses_today, 1);
    }

    #[tokio::test]
    async fn test_store_failure_sends_nothing() {
        let store = Arc::new(MemStore { fail_save: true, ..Default::default() });
        let channel = Arc::new(Recorder::default());
        let t = tracker(store, channel.clone());

        let result = t.handle(Event::LogDose { strength_mg: None }).await;
        assert!(matches!(result, Err(DitchPouchError::Store(_))));
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_events_are_serialized() {
        let store = Arc::new(MemStore::default());
        let t = Arc::new(tracker(store, Arc::new(Recorder::default())));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let t = t.clone();
            handles.push(tokio::spawn(async move {
                t.handle(Event::LogDose { strength_mg: None }).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(t.snapshot().await.unwrap().doses_today, 25);
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_close_day_ticks_once_per_date() {
        let store = Arc::new(MemStore::default());
        let t = tracker(store.clone(), Arc::new(Recorder::default()));
        t.handle(Event::SelectStrength { mg: 20 }).await.unwrap();
        for _ in 0..4 {
            t.handle(Event::LogDose { strength_mg: None }).await.unwrap();
        }

        t.close_day(day(10)).await.unwrap();
        let after = t.snapshot().await.unwrap();
        assert_eq!(after.doses_today, 0);
        assert_eq!(after.yesterday_total, Some(4));
        assert_eq!(t.last_boundary().await.unwrap(), Some(day(10)));

        // Same date again, or an older one, is a no-op
        t.handle(Event::LogDose { strength_mg: None }).await.unwrap();
        assert!(t.close_day(day(10)).await.unwrap().is_empty());
        assert!(t.close_day(day(9)).await.unwrap().is_empty());
        assert_eq!(t.snapshot().await.unwrap().doses_today, 1);

        t.close_day(day(11)).await.unwrap();
        assert_eq!(t.snapshot().await.unwrap().yesterday_total, Some(1));
        assert_eq!(t.last_boundary().await.unwrap(), Some(day(11)));
    }

    #[tokio::test]
    async fn test_close_day_store_failure_leaves_date_unrecorded() {
        let store = Arc::new(MemStore { fail_save: true, ..Default::default() });
        *store.record.lock().unwrap() = Some(UserProgress {
            doses_today: 2,
            ..UserProgress::default()
        });
        let t = tracker(store.clone(), Arc::new(Recorder::default()));
        assert!(t.close_day(day(10)).await.is_err());
        assert_eq!(t.last_boundary().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_boundary_baseline_does_not_tick() {
        let store = Arc::new(MemStore::default());
        let t = tracker(store.clone(), Arc::new(Recorder::default()));
        t.handle(Event::LogDose { strength_mg: None }).await.unwrap();
        t.record_boundary(day(10)).await.unwrap();
        assert_eq!(t.snapshot().await.unwrap().doses_today, 1);
        assert!(t.close_day(day(10)).await.unwrap().is_empty());
    }
}
