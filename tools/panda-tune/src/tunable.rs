use async_trait::async_trait;
use tracing::debug;

use crate::proc::ProcError;

/// Whether a tuner can run in the current environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Support {
    Supported,
    /// Not a failure: the tuner is skipped, with a human-readable reason.
    Unsupported(String),
}

impl Support {
    pub fn is_supported(&self) -> bool {
        matches!(self, Support::Supported)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TuneError {
    #[error(transparent)]
    Process(#[from] ProcError),

    #[error("check '{check}' failed: {message}")]
    Check { check: String, message: String },
}

#[derive(Debug)]
pub struct TuneResult {
    reboot_required: bool,
    error: Option<TuneError>,
}

impl TuneResult {
    pub fn ok(reboot_required: bool) -> Self {
        Self {
            reboot_required,
            error: None,
        }
    }

    pub fn failed(error: impl Into<TuneError>) -> Self {
        Self {
            reboot_required: false,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn reboot_required(&self) -> bool {
        self.reboot_required
    }

    pub fn error(&self) -> Option<&TuneError> {
        self.error.as_ref()
    }
}

#[async_trait]
pub trait Tunable: Send + Sync {
    fn check_if_supported(&self) -> Support;
    async fn tune(&self) -> TuneResult;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub is_ok: bool,
    pub current: String,
    pub desired: String,
    pub error: Option<String>,
}

pub trait Checker: Send + Sync {
    fn description(&self) -> String;
    fn check(&self) -> CheckResult;
}

/// Action a [`CheckedTunable`] runs once its checker reports work to do.
#[async_trait]
pub trait TuneAction: Send + Sync {
    fn supported(&self) -> Support;
    async fn apply(&self) -> TuneResult;
}

/// Runs `action` only when `checker` says the system is not tuned yet.
pub struct CheckedTunable<A> {
    checker: Box<dyn Checker>,
    action: A,
    reboot_required: bool,
}

impl<A: TuneAction> CheckedTunable<A> {
    pub fn new(
        checker: Box<dyn Checker>,
        action: A,
        reboot_required: bool,
    ) -> Self {
        Self {
            checker,
            action,
            reboot_required,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }
}

#[async_trait]
impl<A: TuneAction> Tunable for CheckedTunable<A> {
    fn check_if_supported(&self) -> Support {
        self.action.supported()
    }

    async fn tune(&self) -> TuneResult {
        let res = self.checker.check();
        if let Some(message) = res.error {
            return TuneResult::failed(TuneError::Check {
                check: self.checker.description(),
                message,
            });
        }
        if res.is_ok {
            debug!(
                "Checker '{}' result is OK, skipping tuning",
                self.checker.description()
            );
            return TuneResult::ok(false);
        }
        let out = self.action.apply().await;
        if out.is_failed() {
            return out;
        }
        TuneResult::ok(self.reboot_required || out.reboot_required())
    }
}
