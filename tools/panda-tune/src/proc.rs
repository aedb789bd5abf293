use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("failed to run '{cmd}': {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{cmd}' timed out after {timeout:?}")]
    Timeout { cmd: String, timeout: Duration },

    #[error("'{cmd}' exited with status {code:?}")]
    Exit { cmd: String, code: Option<i32> },
}

/// Output lines of a finished process and how it ended. Lines are kept even
/// when the process failed or timed out.
#[derive(Debug)]
pub struct ProcOutput {
    pub lines: Vec<String>,
    pub result: Result<(), ProcError>,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        cmd: &Path,
        args: &[String],
        timeout: Duration,
    ) -> ProcOutput;
}

#[derive(Clone, Debug, Default)]
pub struct TokioProcessRunner;

type LineSink = Arc<Mutex<Vec<String>>>;

/// Collect lines from `pipe` as they arrive.
fn drain<R>(pipe: Option<R>) -> (LineSink, Option<JoinHandle<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let sink = LineSink::default();
    let handle = pipe.map(|pipe| {
        let sink = sink.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(pipe).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                sink.lock().unwrap_or_else(|e| e.into_inner()).push(line);
            }
        })
    });
    (sink, handle)
}

fn take(sink: &LineSink) -> Vec<String> {
    std::mem::take(&mut *sink.lock().unwrap_or_else(|e| e.into_inner()))
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        cmd: &Path,
        args: &[String],
        timeout: Duration,
    ) -> ProcOutput {
        let name = cmd.display().to_string();
        let spawned = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(c) => c,
            Err(source) => {
                return ProcOutput {
                    lines: Vec::new(),
                    result: Err(ProcError::Spawn { cmd: name, source }),
                };
            }
        };
        let (stdout, out_reader) = drain(child.stdout.take());
        let (stderr, err_reader) = drain(child.stderr.take());
        let readers = [out_reader, err_reader];

        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let result = match waited {
            Err(_) => {
                let _ = child.kill().await;
                // Descendants may still hold the pipes open; keep what was
                // read so far.
                for r in readers.iter().flatten() {
                    r.abort();
                }
                Err(ProcError::Timeout { cmd: name, timeout })
            }
            Ok(Err(source)) => Err(ProcError::Spawn { cmd: name, source }),
            Ok(Ok(status)) => {
                for r in readers.into_iter().flatten() {
                    let _ = r.await;
                }
                if status.success() {
                    Ok(())
                } else {
                    Err(ProcError::Exit {
                        cmd: name,
                        code: status.code(),
                    })
                }
            }
        };

        let mut lines = take(&stdout);
        lines.extend(take(&stderr));
        ProcOutput { lines, result }
    }
}
