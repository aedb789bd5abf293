//! Wrapper around the `iotune-redpanda` disk benchmark, exposed as a
//! [`Tunable`] that only runs when the I/O properties file is missing.

use std::ffi::OsString;
use std::io;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::proc::{
    ProcError, ProcOutput, ProcessRunner, TokioProcessRunner,
};
use crate::tunable::{
    CheckResult, CheckedTunable, Checker, Support, TuneAction, TuneResult,
};

pub const IOTUNE_BIN: &str = "iotune-redpanda";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Envfile,
    Seastar,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Envfile => f.write_str("envfile"),
            OutputFormat::Seastar => f.write_str("seastar"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IoTuneArgs {
    pub dirs: Vec<PathBuf>,
    pub format: OutputFormat,
    pub properties_file: Option<PathBuf>,
    pub io_conf_file: Option<PathBuf>,
    pub duration: Duration,
    pub fs_check: bool,
}

impl IoTuneArgs {
    pub fn to_command_line(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .dirs
            .iter()
            .map(|d| format!("--evaluation-directory={}", d.display()))
            .collect();
        args.push(format!("--format={}", self.format));
        if let Some(file) = &self.properties_file {
            args.push(format!("--properties-file={}", file.display()));
        }
        if let Some(file) = &self.io_conf_file {
            args.push(format!("--options-file={}", file.display()));
        }
        args.push(format!("--duration={}", self.duration.as_secs()));
        if self.fs_check {
            args.push("--fs-check=true".to_string());
        }
        args
    }
}

pub struct IoTune<R> {
    runner: Arc<R>,
    timeout: Duration,
}

impl<R: ProcessRunner> IoTune<R> {
    pub fn new(runner: Arc<R>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Run the benchmark binary found at `bin`.
    pub async fn run(&self, bin: &Path, args: &IoTuneArgs) -> ProcOutput {
        self.runner
            .run(bin, &args.to_command_line(), self.timeout)
            .await
    }
}

/// Satisfied once the I/O properties file exists.
pub struct IoConfigFileChecker {
    path: PathBuf,
}

impl IoConfigFileChecker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Checker for IoConfigFileChecker {
    fn description(&self) -> String {
        "I/O config file exists".to_string()
    }

    fn check(&self) -> CheckResult {
        match self.path.try_exists() {
            Ok(exists) => CheckResult {
                is_ok: exists,
                current: exists.to_string(),
                desired: "true".to_string(),
                error: None,
            },
            Err(e) => CheckResult {
                is_ok: false,
                current: String::new(),
                desired: "true".to_string(),
                error: Some(format!("{}: {}", self.path.display(), e)),
            },
        }
    }
}

pub struct IoTuneAction<R> {
    dirs: Vec<PathBuf>,
    config_file: PathBuf,
    duration: Duration,
    io_tune: IoTune<R>,
    search_path: Option<OsString>,
}

impl<R: ProcessRunner> IoTuneAction<R> {
    pub fn new(
        dirs: Vec<PathBuf>,
        config_file: impl Into<PathBuf>,
        duration: Duration,
        timeout: Duration,
        runner: Arc<R>,
    ) -> Self {
        Self {
            dirs,
            config_file: config_file.into(),
            duration,
            io_tune: IoTune::new(runner, timeout),
            search_path: None,
        }
    }

    /// Resolve the binary against `path` instead of the `PATH` variable.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn args(&self) -> IoTuneArgs {
        IoTuneArgs {
            dirs: self.dirs.clone(),
            format: OutputFormat::Seastar,
            properties_file: Some(self.config_file.clone()),
            io_conf_file: None,
            duration: self.duration,
            fs_check: false,
        }
    }

    fn locate(&self) -> Option<PathBuf> {
        let paths = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))?;
        let cwd =
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        which::which_in(IOTUNE_BIN, Some(paths), cwd).ok()
    }
}

#[async_trait]
impl<R: ProcessRunner> TuneAction for IoTuneAction<R> {
    fn supported(&self) -> Support {
        match self.locate() {
            Some(_) => Support::Supported,
            None => Support::Unsupported(format!(
                "'{IOTUNE_BIN}' not found in PATH"
            )),
        }
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(config_file = %self.config_file.display())
    )]
    async fn apply(&self) -> TuneResult {
        // Run exactly the binary the support check resolved.
        let Some(bin) = self.locate() else {
            return TuneResult::failed(ProcError::Spawn {
                cmd: IOTUNE_BIN.to_string(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "not found in PATH",
                ),
            });
        };
        let out = self.io_tune.run(&bin, &self.args()).await;
        for line in &out.lines {
            debug!("{}", line);
        }
        match out.result {
            Ok(()) => TuneResult::ok(false),
            Err(e) => TuneResult::failed(e),
        }
    }
}

/// I/O scheduler tuner backed by the real process runner.
pub fn new_io_tune_tuner(
    dirs: Vec<PathBuf>,
    config_file: impl Into<PathBuf>,
    duration: Duration,
    timeout: Duration,
) -> CheckedTunable<IoTuneAction<TokioProcessRunner>> {
    let config_file = config_file.into();
    let action = IoTuneAction::new(
        dirs,
        config_file.clone(),
        duration,
        timeout,
        Arc::new(TokioProcessRunner),
    );
    CheckedTunable::new(
        Box::new(IoConfigFileChecker::new(config_file)),
        action,
        false,
    )
}
