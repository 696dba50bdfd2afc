//! The countdown loop and the expiry action.
//!
//! A worker is single-use: [`HangupWorker::run`] takes it by value, so an
//! instance can reach at most one terminal state and can fire the hangup at
//! most once.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::state::{Deadline, WorkflowState};
use crate::clock::{Clock, MonotonicClock};
use crate::progress::{NullProgress, ProgressSink};
use crate::telephony::TelephonyController;

/// One progress sample per second.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Collaborators shared by every worker of a session.
#[derive(Clone)]
pub struct WorkerContext {
    pub clock: Arc<dyn Clock>,
    pub telephony: Arc<dyn TelephonyController>,
    pub progress: Arc<dyn ProgressSink>,
    pub tick: Duration,
}

impl WorkerContext {
    /// Monotonic clock, no progress display, one-second ticks.
    pub fn new(telephony: Arc<dyn TelephonyController>) -> Self {
        Self {
            clock: Arc::new(MonotonicClock::new()),
            telephony,
            progress: Arc::new(NullProgress),
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        // a zero tick would spin
        self.tick = tick.max(Duration::from_millis(1));
        self
    }
}

/// A single countdown instance.
pub struct HangupWorker {
    deadline: Option<Deadline>,
    ctx: WorkerContext,
    state: WorkflowState,
    ticks: u64,
}

impl HangupWorker {
    pub fn new(deadline: Option<Deadline>, ctx: WorkerContext) -> Self {
        Self {
            deadline,
            ctx,
            state: WorkflowState::Running,
            ticks: 0,
        }
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Count down to the deadline, then try to end the active call.
    ///
    /// `cancel` is checked at the top of every tick and raced against every
    /// sleep. Once it fires nothing else is published and the call is left
    /// alone.
    pub async fn run(mut self, cancel: CancellationToken) -> WorkflowState {
        let Some(deadline) = self.deadline else {
            tracing::warn!("countdown started without a deadline");
            return self.transition(WorkflowState::NoTargetFound);
        };

        tracing::info!(
            deadline_ms = deadline.as_ms(),
            tick_ms = self.ctx.tick.as_millis() as u64,
            "countdown started"
        );

        let expired = self.count_down(deadline, &cancel).await;
        // no stale indicator, whichever way the loop ended
        self.ctx.progress.clear();

        let next = if expired && !cancel.is_cancelled() {
            self.terminate_call(&cancel).await
        } else {
            WorkflowState::CancelledExternally
        };

        let state = self.transition(next);
        self.ctx.progress.finish(&state);
        state
    }

    /// Returns `true` on expiry and `false` on cancellation.
    async fn count_down(&mut self, deadline: Deadline, cancel: &CancellationToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }

            let remaining = deadline.remaining(self.ctx.clock.now_ms());
            self.report(remaining);
            if remaining == 0 {
                return true;
            }
            self.ticks += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.ctx.tick) => {}
            }
        }
    }

    fn report(&self, remaining_ms: u64) {
        tracing::debug!(remaining_ms, tick = self.ticks, "countdown tick");
        if let Err(e) = self.ctx.progress.publish(remaining_ms) {
            // display only; the countdown carries on
            tracing::warn!(error = %e, "couldn't publish countdown progress");
        }
    }

    /// Single attempt, no retry. A cancellation that lands while the call
    /// state is still being queried wins; once the hangup is issued it runs
    /// to completion.
    async fn terminate_call(&self, cancel: &CancellationToken) -> WorkflowState {
        let telephony = &self.ctx.telephony;
        let active = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("cancelled while querying call state");
                return WorkflowState::CancelledExternally;
            }
            active = telephony.is_call_active() => active,
        };

        match active {
            Ok(false) => WorkflowState::ExpiredNoTargetFound,
            Ok(true) => match telephony.end_active_call().await {
                Ok(true) => WorkflowState::ExpiredActionSucceeded,
                Ok(false) => {
                    tracing::warn!("host declined to end the call");
                    WorkflowState::ExpiredActionFailed
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to end call");
                    WorkflowState::ExpiredActionFailed
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to query call state");
                WorkflowState::ExpiredActionFailed
            }
        }
    }

    fn transition(&mut self, next: WorkflowState) -> WorkflowState {
        debug_assert!(
            self.state == WorkflowState::Running && next.is_terminal(),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::info!(outcome = %next, ticks = self.ticks, "countdown finished");
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelephonyError;
    use crate::progress::ProgressError;
    use crate::telephony::SimulatedTelephony;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        samples: Mutex<Vec<u64>>,
        clears: Mutex<usize>,
        finished: Mutex<Vec<WorkflowState>>,
    }

    impl ProgressSink for Recorder {
        fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError> {
            self.samples.lock().unwrap().push(remaining_ms);
            Ok(())
        }

        fn clear(&self) {
            *self.clears.lock().unwrap() += 1;
        }

        fn finish(&self, state: &WorkflowState) {
            self.finished.lock().unwrap().push(*state);
        }
    }

    struct Denied;

    impl ProgressSink for Denied {
        fn publish(&self, _remaining_ms: u64) -> Result<(), ProgressError> {
            Err(ProgressError::Denied("notifications off".into()))
        }
    }

    /// Answers the status query only after `delay`.
    struct SlowPhone {
        phone: SimulatedTelephony,
        delay: Duration,
    }

    #[async_trait]
    impl TelephonyController for SlowPhone {
        async fn is_call_active(&self) -> Result<bool, TelephonyError> {
            tokio::time::sleep(self.delay).await;
            self.phone.is_call_active().await
        }

        async fn end_active_call(&self) -> Result<bool, TelephonyError> {
            self.phone.end_active_call().await
        }
    }

    fn context(phone: &SimulatedTelephony, recorder: Arc<Recorder>) -> (WorkerContext, Arc<MonotonicClock>) {
        let clock = Arc::new(MonotonicClock::new());
        let ctx = WorkerContext::new(Arc::new(phone.clone()))
            .with_clock(clock.clone())
            .with_progress(recorder);
        (ctx, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_with_active_call_ends_it() {
        let phone = SimulatedTelephony::with_active_call();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder.clone());

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 5_000)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::ExpiredActionSucceeded);
        assert_eq!(phone.end_count(), 1);
        assert!(!phone.call_active());
        assert_eq!(
            *recorder.samples.lock().unwrap(),
            vec![5_000, 4_000, 3_000, 2_000, 1_000, 0]
        );
        assert_eq!(*recorder.clears.lock().unwrap(), 1);
        assert_eq!(*recorder.finished.lock().unwrap(), vec![state]);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_without_call_reports_no_target() {
        let phone = SimulatedTelephony::idle();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder);

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 2_000)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::ExpiredNoTargetFound);
        assert_eq!(phone.query_count(), 1);
        assert_eq!(phone.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_telephony_is_an_outcome_not_a_crash() {
        let phone = SimulatedTelephony::with_active_call();
        phone.deny_all();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder);

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 1_000)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::ExpiredActionFailed);
        assert_eq!(phone.query_count(), 1);
        assert_eq!(phone.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_hangup_is_attempted_once() {
        let phone = SimulatedTelephony::with_active_call();
        phone.decline_end();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder);

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 1_000)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::ExpiredActionFailed);
        assert_eq!(phone.end_count(), 1);
        assert!(phone.call_active());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_deadline_has_no_side_effects() {
        let phone = SimulatedTelephony::with_active_call();
        let recorder = Arc::new(Recorder::default());
        let (ctx, _clock) = context(&phone, recorder.clone());

        let worker = HangupWorker::new(Deadline::from_raw(Some(-1)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::NoTargetFound);
        assert!(recorder.samples.lock().unwrap().is_empty());
        assert_eq!(*recorder.clears.lock().unwrap(), 0);
        assert_eq!(phone.query_count(), 0);
        assert_eq!(phone.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_countdown_skips_the_hangup() {
        let phone = SimulatedTelephony::with_active_call();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder.clone());
        let cancel = CancellationToken::new();

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 5_000)), ctx);
        let handle = tokio::spawn(worker.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        cancel.cancel();
        let state = handle.await.unwrap();

        assert_eq!(state, WorkflowState::CancelledExternally);
        assert_eq!(phone.query_count(), 0);
        assert_eq!(phone.end_count(), 0);
        assert_eq!(*recorder.samples.lock().unwrap(), vec![5_000, 4_000, 3_000]);
        assert_eq!(*recorder.clears.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_publishes_nothing() {
        let phone = SimulatedTelephony::with_active_call();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 5_000)), ctx);
        let state = worker.run(cancel).await;

        assert_eq!(state, WorkflowState::CancelledExternally);
        assert!(recorder.samples.lock().unwrap().is_empty());
        assert_eq!(phone.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_failures_do_not_abort_countdown() {
        let phone = SimulatedTelephony::with_active_call();
        let clock = Arc::new(MonotonicClock::new());
        let ctx = WorkerContext::new(Arc::new(phone.clone()))
            .with_clock(clock.clone())
            .with_progress(Arc::new(Denied));

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 3_000)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::ExpiredActionSucceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_expires_without_ticking() {
        let phone = SimulatedTelephony::idle();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder.clone());

        tokio::time::advance(Duration::from_millis(10_000)).await;
        assert!(clock.now_ms() >= 10_000);

        let worker = HangupWorker::new(Some(Deadline::at(1_000)), ctx);
        let state = worker.run(CancellationToken::new()).await;

        assert_eq!(state, WorkflowState::ExpiredNoTargetFound);
        assert_eq!(*recorder.samples.lock().unwrap(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_tick_changes_sample_rate() {
        let phone = SimulatedTelephony::idle();
        let recorder = Arc::new(Recorder::default());
        let (ctx, clock) = context(&phone, recorder.clone());
        let ctx = ctx.with_tick(Duration::from_millis(500));

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 1_500)), ctx);
        worker.run(CancellationToken::new()).await;

        assert_eq!(*recorder.samples.lock().unwrap(), vec![1_500, 1_000, 500, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_slow_query_skips_the_hangup() {
        let phone = SimulatedTelephony::with_active_call();
        let slow = SlowPhone {
            phone: phone.clone(),
            delay: Duration::from_secs(30),
        };
        let clock = Arc::new(MonotonicClock::new());
        let recorder = Arc::new(Recorder::default());
        let ctx = WorkerContext::new(Arc::new(slow))
            .with_clock(clock.clone())
            .with_progress(recorder.clone());
        let cancel = CancellationToken::new();

        let worker = HangupWorker::new(Some(Deadline::after(clock.as_ref(), 0)), ctx);
        let handle = tokio::spawn(worker.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_finished());
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), WorkflowState::CancelledExternally);
        assert_eq!(phone.query_count(), 0);
        assert_eq!(phone.end_count(), 0);
        assert!(phone.call_active());
        assert_eq!(
            *recorder.finished.lock().unwrap(),
            vec![WorkflowState::CancelledExternally]
        );
    }
}
