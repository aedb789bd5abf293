pub mod iotune;
pub mod proc;
pub mod tunable;

pub use iotune::{
    IoConfigFileChecker, IoTune, IoTuneAction, IoTuneArgs, new_io_tune_tuner,
};
pub use proc::{ProcError, ProcOutput, ProcessRunner, TokioProcessRunner};
pub use tunable::{
    CheckResult, CheckedTunable, Checker, Support, TuneAction, TuneError,
    TuneResult, Tunable,
};

use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init_tracing(default_env: &str) {
    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .from_env_lossy()
        .add_directive(
            default_env
                .parse()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        );

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}
