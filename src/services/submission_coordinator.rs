/// Contact submission flow
///
/// `SubmissionPipeline` runs one attempt: schema, bot heuristics, strip,
/// dispatch. `ContactForm` wraps it with the state of a single form
/// instance: field values, the submit status flag, and the last toast.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::middleware::metrics::{observe_dispatch, record_submission_outcome};
use crate::models::{
    BotReason, FieldErrors, InquiryInput, Notification, SubmissionResult, SubmissionStatus,
    HONEYPOT_FIELD,
};
use crate::services::bot_heuristic_service::{BotHeuristicService, BotVerdict};
use crate::services::mail_dispatch_service::{DispatchOutcome, MailDispatcher};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::log_sanitizer::mask_email_for_log;

pub struct SubmissionPipeline<D> {
    dispatcher: D,
    heuristics: BotHeuristicService,
}

impl<D: MailDispatcher> SubmissionPipeline<D> {
    pub fn new(dispatcher: D, heuristics: BotHeuristicService) -> Self {
        Self { dispatcher, heuristics }
    }

    /// One submit attempt; the dispatcher is called at most once
    pub async fn process(&self, input: &InquiryInput, now_ms: i64) -> SubmissionResult {
        let result = self.run(input, now_ms).await;
        record_submission_outcome(result.outcome_label());
        result
    }

    async fn run(&self, input: &InquiryInput, now_ms: i64) -> SubmissionResult {
        if let Err(errors) = input.check() {
            // The honeypot is invisible, so its violation is a bot signal,
            // not an inline message
            if errors.contains(HONEYPOT_FIELD) {
                tracing::warn!("Bot detected via honeypot (schema)");
                return SubmissionResult::RejectedBot(BotReason::HoneypotFilled);
            }

            tracing::debug!(fields = ?errors.fields().collect::<Vec<_>>(), "Inquiry failed validation");
            return SubmissionResult::Invalid(errors);
        }

        if let BotVerdict::Bot(reason) = self.heuristics.evaluate(input, now_ms) {
            return SubmissionResult::RejectedBot(reason);
        }

        let payload = input.to_payload();

        let started = Instant::now();
        let outcome = self.dispatcher.dispatch(&payload).await;
        observe_dispatch(started.elapsed(), outcome.is_sent());

        match outcome {
            DispatchOutcome::Sent => {
                tracing::info!(
                    submitter = %mask_email_for_log(&payload.email),
                    "Contact inquiry dispatched"
                );
                SubmissionResult::Accepted
            }
            DispatchOutcome::Failed(detail) => {
                tracing::error!(detail = %detail, "Error sending contact inquiry");
                SubmissionResult::DispatchFailed(detail)
            }
        }
    }
}

#[derive(Debug)]
struct FormState {
    input: InquiryInput,
    status: SubmissionStatus,
    notification: Option<Notification>,
    field_errors: FieldErrors,
}

/// Releases the `Submitting` flag if a submit future is dropped mid-flight
struct InFlight<'a> {
    state: &'a Mutex<FormState>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.status = SubmissionStatus::Settled;
            tracing::warn!("Contact submission abandoned before it settled");
        }
    }
}

/// One rendered contact form
///
/// The status flag is set to `Submitting` before the first await, so a
/// second `submit` on the same instance is refused instead of dispatching
/// twice. Field values survive every outcome except `Accepted`.
pub struct ContactForm<D, C = SystemClock> {
    pipeline: SubmissionPipeline<D>,
    clock: C,
    fallback_email: String,
    state: Mutex<FormState>,
}

impl<D: MailDispatcher, C: Clock> ContactForm<D, C> {
    pub fn new(pipeline: SubmissionPipeline<D>, clock: C, fallback_email: impl Into<String>) -> Self {
        let opened_at = clock.now_ms();
        Self {
            pipeline,
            clock,
            fallback_email: fallback_email.into(),
            state: Mutex::new(FormState {
                input: InquiryInput::blank(opened_at),
                status: SubmissionStatus::Idle,
                notification: None,
                field_errors: FieldErrors::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Edit visible fields; `form_opened_at` cannot be changed this way
    pub fn update(&self, edit: impl FnOnce(&mut InquiryInput)) {
        let mut state = self.state();
        let opened_at = state.input.form_opened_at;
        edit(&mut state.input);
        state.input.form_opened_at = opened_at;
    }

    pub fn input(&self) -> InquiryInput {
        self.state().input.clone()
    }

    pub fn status(&self) -> SubmissionStatus {
        self.state().status
    }

    pub fn notification(&self) -> Option<Notification> {
        self.state().notification.clone()
    }

    pub fn field_errors(&self) -> FieldErrors {
        self.state().field_errors.clone()
    }

    pub async fn submit(&self) -> SubmissionResult {
        let input = {
            let mut state = self.state();
            if state.status == SubmissionStatus::Submitting {
                return SubmissionResult::AlreadySubmitting;
            }
            state.status = SubmissionStatus::Submitting;
            state.input.clone()
        };
        let in_flight = InFlight { state: &self.state, armed: true };

        let result = self.pipeline.process(&input, self.clock.now_ms()).await;

        in_flight.disarm();
        let mut state = self.state();
        match &result {
            SubmissionResult::Accepted => {
                let fresh = self.clock.now_ms().max(state.input.form_opened_at + 1);
                state.input = InquiryInput::blank(fresh);
                state.field_errors = FieldErrors::new();
            }
            SubmissionResult::Invalid(errors) => state.field_errors = errors.clone(),
            _ => state.field_errors = FieldErrors::new(),
        }
        state.notification = Notification::for_result(&result, &self.fallback_email);
        state.status = SubmissionStatus::Settled;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InquiryPayload, NotificationVariant, ACCEPTED_COPY, TOO_FAST_REJECTION_COPY};
    use crate::utils::clock::ManualClock;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    const OPENED_AT: i64 = 1_700_000_000_000;
    const FALLBACK: &str = "info@britoniapharmacy.com";

    #[derive(Default)]
    struct MockDispatcher {
        calls: Mutex<Vec<InquiryPayload>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl MockDispatcher {
        fn calls(&self) -> Vec<InquiryPayload> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailDispatcher for MockDispatcher {
        async fn dispatch(&self, payload: &InquiryPayload) -> DispatchOutcome {
            self.calls.lock().unwrap().push(payload.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                DispatchOutcome::Failed("smtp unreachable".to_string())
            } else {
                DispatchOutcome::Sent
            }
        }
    }

    type TestForm = ContactForm<Arc<MockDispatcher>, Arc<ManualClock>>;

    fn form(dispatcher: MockDispatcher) -> (TestForm, Arc<MockDispatcher>, Arc<ManualClock>) {
        let dispatcher = Arc::new(dispatcher);
        let clock = Arc::new(ManualClock::new(OPENED_AT));
        let pipeline = SubmissionPipeline::new(dispatcher.clone(), BotHeuristicService::default());
        (ContactForm::new(pipeline, clock.clone(), FALLBACK), dispatcher, clock)
    }

    fn fill_valid(input: &mut InquiryInput) {
        input.name = "Ama Mensah".to_string();
        input.email = "ama@example.com".to_string();
        input.subject = "Market access in Ghana".to_string();
        input.message = "We would like to register an antimalarial product.".to_string();
        input.company = Some("Kumasi Labs".to_string());
    }

    #[tokio::test]
    async fn test_scenario_a_field_errors_without_dispatch() {
        let (form, dispatcher, clock) = form(MockDispatcher::default());
        form.update(|input| {
            input.name = "Jo".to_string();
            input.email = "a@b.com".to_string();
            input.subject = "Hi".to_string();
            input.message = "short".to_string();
        });
        clock.advance(5_000);

        let result = form.submit().await;

        match &result {
            SubmissionResult::Invalid(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains("subject"));
                assert!(errors.contains("message"));
            }
            other => panic!("expected field errors, got {:?}", other),
        }
        assert_eq!(form.field_errors().len(), 2);
        assert!(form.notification().is_none());
        assert!(dispatcher.calls().is_empty());
        assert_eq!(form.input().subject, "Hi");
    }

    #[tokio::test]
    async fn test_scenario_b_accepted_resets_form() {
        let (form, dispatcher, clock) = form(MockDispatcher::default());
        form.update(fill_valid);
        clock.advance(5_000);

        let result = form.submit().await;

        assert_eq!(result, SubmissionResult::Accepted);
        assert_eq!(dispatcher.calls().len(), 1);

        let toast = form.notification().unwrap();
        assert_eq!(toast.variant, NotificationVariant::Default);
        assert_eq!(toast.description, ACCEPTED_COPY);

        let input = form.input();
        assert_eq!(input.name, "");
        assert_eq!(input.email, "");
        assert_eq!(input.subject, "");
        assert_eq!(input.message, "");
        assert_eq!(input.company, None);
        assert_eq!(input.honeypot, "");
        assert!(input.form_opened_at > OPENED_AT);
        assert_eq!(form.status(), SubmissionStatus::Settled);
    }

    #[tokio::test]
    async fn test_scenario_c_honeypot_never_dispatches() {
        let (form, dispatcher, clock) = form(MockDispatcher::default());
        form.update(|input| {
            fill_valid(input);
            input.honeypot = "http://spam.example".to_string();
        });
        clock.advance(5_000);

        let result = form.submit().await;

        assert_eq!(result, SubmissionResult::RejectedBot(BotReason::HoneypotFilled));
        assert!(dispatcher.calls().is_empty());
        assert!(form.field_errors().is_empty());

        // Resubmitting straight away gives the same answer
        assert_eq!(
            form.submit().await,
            SubmissionResult::RejectedBot(BotReason::HoneypotFilled)
        );
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_honeypot_wins_over_other_field_errors() {
        let (form, dispatcher, clock) = form(MockDispatcher::default());
        form.update(|input| {
            input.name = "J".to_string();
            input.honeypot = "bot".to_string();
        });
        clock.advance(5_000);

        assert_eq!(
            form.submit().await,
            SubmissionResult::RejectedBot(BotReason::HoneypotFilled)
        );
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_d_too_fast_keeps_fields() {
        let (form, dispatcher, clock) = form(MockDispatcher::default());
        form.update(fill_valid);
        clock.advance(500);

        let result = form.submit().await;

        assert_eq!(result, SubmissionResult::RejectedBot(BotReason::TooFast));
        assert_eq!(form.notification().unwrap().description, TOO_FAST_REJECTION_COPY);
        assert!(dispatcher.calls().is_empty());
        assert_eq!(form.input().name, "Ama Mensah");

        // Resubmitting straight away gives the same answer
        assert_eq!(form.submit().await, SubmissionResult::RejectedBot(BotReason::TooFast));
    }

    #[tokio::test]
    async fn test_payload_has_no_hidden_fields() {
        let (form, dispatcher, clock) = form(MockDispatcher::default());
        form.update(fill_valid);
        clock.advance(3_000);

        assert!(form.submit().await.is_accepted());

        let calls = dispatcher.calls();
        assert_eq!(calls.len(), 1);
        let json = serde_json::to_value(&calls[0]).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["company", "email", "message", "name", "subject"]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_keeps_fields() {
        let (form, dispatcher, clock) = form(MockDispatcher {
            fail: true,
            ..Default::default()
        });
        form.update(fill_valid);
        clock.advance(5_000);
        let before = form.input();

        let result = form.submit().await;

        assert_eq!(result, SubmissionResult::DispatchFailed("smtp unreachable".to_string()));
        assert_eq!(form.input(), before);
        assert_eq!(dispatcher.calls().len(), 1);

        let toast = form.notification().unwrap();
        assert_eq!(toast.variant, NotificationVariant::Destructive);
        assert!(toast.description.contains(FALLBACK));
        assert!(!toast.description.contains("smtp"));
        assert_eq!(form.status(), SubmissionStatus::Settled);
    }

    #[tokio::test]
    async fn test_update_cannot_touch_opened_at() {
        let (form, _dispatcher, _clock) = form(MockDispatcher::default());
        form.update(|input| input.form_opened_at = 0);
        assert_eq!(form.input().form_opened_at, OPENED_AT);
    }

    /// Replays a fixed sequence of readings, then repeats the last one
    struct ScriptedClock(Mutex<Vec<i64>>);

    impl Clock for ScriptedClock {
        fn now_ms(&self) -> i64 {
            let mut readings = self.0.lock().unwrap();
            if readings.len() > 1 {
                readings.remove(0)
            } else {
                readings[0]
            }
        }
    }

    #[tokio::test]
    async fn test_fresh_timestamp_strictly_increases_when_clock_steps_back() {
        let dispatcher = Arc::new(MockDispatcher::default());
        // mount, submit, reset
        let clock = ScriptedClock(Mutex::new(vec![OPENED_AT, OPENED_AT + 5_000, OPENED_AT - 1_000]));
        let pipeline = SubmissionPipeline::new(dispatcher.clone(), BotHeuristicService::default());
        let form = ContactForm::new(pipeline, clock, FALLBACK);
        form.update(fill_valid);

        assert!(form.submit().await.is_accepted());
        assert_eq!(form.input().form_opened_at, OPENED_AT + 1);
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_refused() {
        let (form, dispatcher, clock) = form(MockDispatcher {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        form.update(fill_valid);
        clock.advance(5_000);
        let form = Arc::new(form);

        let first = {
            let form = form.clone();
            tokio::spawn(async move { form.submit().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(form.status(), SubmissionStatus::Submitting);
        assert_eq!(form.submit().await, SubmissionResult::AlreadySubmitting);

        assert_eq!(first.await.unwrap(), SubmissionResult::Accepted);
        assert_eq!(dispatcher.calls().len(), 1);
        assert_eq!(form.status(), SubmissionStatus::Settled);
    }

    #[tokio::test]
    async fn test_abandoned_submit_leaves_form_resubmittable() {
        let (form, dispatcher, clock) = form(MockDispatcher {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        form.update(fill_valid);
        clock.advance(5_000);

        let first = tokio::time::timeout(Duration::from_millis(50), form.submit()).await;
        assert!(first.is_err());
        assert_eq!(form.status(), SubmissionStatus::Settled);
        assert_eq!(form.input().name, "Ama Mensah");

        // A second attempt reaches the dispatcher instead of being refused
        let second = tokio::time::timeout(Duration::from_millis(50), form.submit()).await;
        assert!(second.is_err());
        assert_eq!(dispatcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_manual_retry_after_failure_resends_same_values() {
        let (form, dispatcher, clock) = form(MockDispatcher {
            fail: true,
            ..Default::default()
        });
        form.update(fill_valid);
        clock.advance(5_000);

        form.submit().await;
        form.submit().await;

        let calls = dispatcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }
}
