use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeReason {
    HardTimeout,
    Quiescent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Finalize(FinalizeReason),
    Defer,
}

#[derive(Debug, Clone, Copy)]
pub struct StabilityGate {
    hard_timeout_ms: f64,
    quiet_period_ms: f64,
}

impl StabilityGate {
    pub fn new(hard_timeout: Duration, quiet_period: Duration) -> Self {
        Self {
            hard_timeout_ms: hard_timeout.as_secs_f64() * 1000.0,
            quiet_period_ms: quiet_period.as_secs_f64() * 1000.0,
        }
    }

    pub fn evaluate(&self, start_ms: f64, last_snapshot_ms: Option<f64>, now_ms: f64) -> GateDecision {
        if now_ms - start_ms > self.hard_timeout_ms {
            return GateDecision::Finalize(FinalizeReason::HardTimeout);
        }
        let last = last_snapshot_ms.unwrap_or(start_ms);
        if now_ms - last > self.quiet_period_ms {
            return GateDecision::Finalize(FinalizeReason::Quiescent);
        }
        GateDecision::Defer
    }

    pub fn should_finalize(&self, start_ms: f64, last_snapshot_ms: Option<f64>, now_ms: f64) -> bool {
        matches!(
            self.evaluate(start_ms, last_snapshot_ms, now_ms),
            GateDecision::Finalize(_)
        )
    }
}
