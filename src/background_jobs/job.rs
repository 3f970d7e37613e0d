use super::context::JobContext;
use std::time::Duration;
use thiserror::Error;

/// When a job becomes due.
#[derive(Debug, Clone)]
pub enum JobSchedule {
    /// Every `Duration`, counted from the end of the previous run; the first
    /// run happens at scheduler startup
    Interval(Duration),
    /// Only when the hook fires
    Hook(HookEvent),
    /// Optional interval plus any number of hooks
    Combined {
        interval: Option<Duration>,
        hooks: Vec<HookEvent>,
    },
}

impl JobSchedule {
    pub fn interval(&self) -> Option<Duration> {
        match self {
            JobSchedule::Interval(interval) => Some(*interval),
            JobSchedule::Combined { interval, .. } => *interval,
            JobSchedule::Hook(_) => None,
        }
    }

    pub fn listens_to(&self, event: HookEvent) -> bool {
        match self {
            JobSchedule::Hook(hook_event) => *hook_event == event,
            JobSchedule::Combined { hooks, .. } => hooks.contains(&event),
            JobSchedule::Interval(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Fired once when the scheduler starts
    OnStartup,
    /// Fired after a stats aggregation run succeeds
    OnAggregationComplete,
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HookEvent::OnStartup => "OnStartup",
            HookEvent::OnAggregationComplete => "OnAggregationComplete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownBehavior {
    /// The job's token is cancelled on shutdown
    #[default]
    Cancellable,
    /// Shutdown waits (bounded) for the run to finish
    WaitForCompletion,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Job was cancelled")]
    Cancelled,
}

/// A unit of scheduled analytics work.
///
/// `execute` runs on the blocking pool. Jobs that loop over artists or
/// ranges check `ctx.is_cancelled()` between items and return
/// [`JobError::Cancelled`] once it is set.
pub trait BackgroundJob: Send + Sync {
    /// Stable id, used as the metrics label.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    /// Hook fired after a successful run.
    fn completion_hook(&self) -> Option<HookEvent> {
        None
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
