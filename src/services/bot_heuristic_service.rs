/// Anti-automation checks run after schema validation
///
/// The honeypot rule repeats the schema's own check on purpose; the
/// elapsed-time rule cannot be expressed as a static field rule at all.

use crate::models::{BotReason, InquiryInput};

/// Fastest plausible time for a human to fill in the form
pub const MIN_FILL_TIME_MS: i64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotVerdict {
    Human,
    Bot(BotReason),
}

#[derive(Debug, Clone, Copy)]
pub struct BotHeuristicService {
    min_fill_time_ms: i64,
}

impl Default for BotHeuristicService {
    fn default() -> Self {
        Self::new(MIN_FILL_TIME_MS)
    }
}

impl BotHeuristicService {
    pub fn new(min_fill_time_ms: i64) -> Self {
        Self { min_fill_time_ms }
    }

    pub fn min_fill_time_ms(&self) -> i64 {
        self.min_fill_time_ms
    }

    /// Decide whether `input` looks human, given the current time
    ///
    /// There is no upper bound on elapsed time: a form left open for a day
    /// is still accepted. A `form_opened_at` in the future counts as too fast.
    pub fn evaluate(&self, input: &InquiryInput, now_ms: i64) -> BotVerdict {
        if !input.honeypot.is_empty() {
            tracing::warn!("Bot detected via honeypot");
            return BotVerdict::Bot(BotReason::HoneypotFilled);
        }

        let elapsed_ms = now_ms.saturating_sub(input.form_opened_at);
        if elapsed_ms < self.min_fill_time_ms {
            tracing::warn!(elapsed_ms, "Bot detected: form submitted too quickly");
            return BotVerdict::Bot(BotReason::TooFast);
        }

        BotVerdict::Human
    }
}
