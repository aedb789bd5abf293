use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use panda_tune::{
    CheckedTunable, IoConfigFileChecker, IoTuneAction, ProcError, ProcOutput,
    ProcessRunner, Support, TuneError, Tunable,
};

#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    fail: bool,
}

impl FakeRunner {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        cmd: &Path,
        args: &[String],
        _timeout: Duration,
    ) -> ProcOutput {
        self.calls
            .lock()
            .unwrap()
            .push((cmd.to_path_buf(), args.to_vec()));
        let result = if self.fail {
            Err(ProcError::Exit {
                cmd: cmd.display().to_string(),
                code: Some(1),
            })
        } else {
            Ok(())
        };
        ProcOutput {
            lines: vec!["Starting Evaluation".to_string()],
            result,
        }
    }
}

fn tuner(
    runner: Arc<FakeRunner>,
    dir: &tempfile::TempDir,
) -> CheckedTunable<IoTuneAction<FakeRunner>> {
    let config = dir.path().join("io-config.yaml");
    let action = IoTuneAction::new(
        vec![dir.path().join("data")],
        config.clone(),
        Duration::from_secs(10),
        Duration::from_secs(60),
        runner,
    )
    .with_search_path(dir.path());
    CheckedTunable::new(
        Box::new(IoConfigFileChecker::new(config)),
        action,
        false,
    )
}

#[cfg(unix)]
fn install_iotune(dir: &tempfile::TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.path().join("iotune-redpanda");
    std::fs::write(&bin, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755))
        .unwrap();
    bin
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn runs_resolved_iotune_when_config_missing() {
    let dir = tempfile::tempdir().unwrap();
    let bin = install_iotune(&dir);
    let runner = Arc::new(FakeRunner::default());
    let res = tuner(runner.clone(), &dir).tune().await;

    assert!(!res.is_failed());
    assert!(!res.reboot_required());
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let (cmd, args) = &calls[0];
    assert_eq!(cmd, &bin);
    assert_eq!(
        args,
        &vec![
            format!(
                "--evaluation-directory={}",
                dir.path().join("data").display()
            ),
            "--format=seastar".to_string(),
            format!(
                "--properties-file={}",
                dir.path().join("io-config.yaml").display()
            ),
            "--duration=10".to_string(),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn skips_iotune_when_config_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("io-config.yaml"), "disks: []\n").unwrap();
    let runner = Arc::new(FakeRunner::default());
    let res = tuner(runner.clone(), &dir).tune().await;

    assert!(!res.is_failed());
    assert!(runner.calls().is_empty());
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn process_failure_is_a_tune_error() {
    let dir = tempfile::tempdir().unwrap();
    install_iotune(&dir);
    let runner = Arc::new(FakeRunner::failing());
    let res = tuner(runner, &dir).tune().await;

    assert!(matches!(
        res.error(),
        Some(TuneError::Process(ProcError::Exit { code: Some(1), .. }))
    ));
}

#[test_log::test(tokio::test)]
async fn unresolvable_binary_is_never_run() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::default());
    let res = tuner(runner.clone(), &dir).tune().await;

    assert!(matches!(
        res.error(),
        Some(TuneError::Process(ProcError::Spawn { .. }))
    ));
    assert!(runner.calls().is_empty());
}

#[test]
fn unsupported_without_binary_on_path() {
    let dir = tempfile::tempdir().unwrap();
    let t = tuner(Arc::new(FakeRunner::default()), &dir);
    assert_eq!(
        t.check_if_supported(),
        Support::Unsupported("'iotune-redpanda' not found in PATH".into())
    );
}

#[cfg(unix)]
#[test]
fn supported_with_executable_on_path() {
    let dir = tempfile::tempdir().unwrap();
    install_iotune(&dir);

    let t = tuner(Arc::new(FakeRunner::default()), &dir);
    assert_eq!(t.check_if_supported(), Support::Supported);
}
