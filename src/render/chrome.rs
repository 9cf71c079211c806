use super::{Readiness, RenderedPage, Renderer};
use crate::{config, error::RenderError};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Renders pages with a headless Chromium subprocess and `--dump-dom`.
pub struct ChromeRenderer {
    exe: PathBuf,
    extra_args: Vec<String>,
    virtual_time_budget: Duration,
}

/// A running browser process. Dropping it kills and reaps the process, so every
/// exit path out of a render releases the browser.
struct BrowserSession {
    child: Child,
    exe: String,
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        debug!("browser session closed");
    }
}

struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ChromeRenderer {
    pub fn new(cfg: &config::Render) -> Self {
        Self {
            exe: PathBuf::from(&cfg.browser_exe),
            extra_args: cfg.extra_args.clone(),
            virtual_time_budget: Duration::from_millis(cfg.virtual_time_budget_ms),
        }
    }

    /// `<exe> --version`, for `doctor`.
    pub fn version(&self) -> anyhow::Result<String> {
        let timeout = Duration::from_secs(15);
        let session = self.spawn(&["--version".to_string()])?;
        match wait_with_timeout(session, timeout)? {
            Some(out) if out.status.success() => {
                Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
            }
            Some(out) => Err(anyhow::anyhow!(
                "{} --version exited with {}: {}",
                self.exe.display(),
                out.status,
                last_line(&out.stderr)
            )),
            None => Err(anyhow::anyhow!(
                "{} --version did not finish within {:?}",
                self.exe.display(),
                timeout
            )),
        }
    }

    fn spawn(&self, args: &[String]) -> Result<BrowserSession, RenderError> {
        debug!("browser run {} {:?}", self.exe.display(), args);
        let child = Command::new(&self.exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::Launch {
                exe: self.exe.display().to_string(),
                source,
            })?;
        Ok(BrowserSession {
            child,
            exe: self.exe.display().to_string(),
        })
    }

    /// One navigation. `Ok(None)` means `timeout` ran out first.
    fn dump_dom(&self, url: &str, timeout: Duration) -> Result<Option<String>, RenderError> {
        let mut args = vec![
            "--headless".to_string(),
            "--hide-scrollbars".to_string(),
            "--dump-dom".to_string(),
            format!("--virtual-time-budget={}", self.virtual_time_budget.as_millis()),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(url.to_string());

        let session = self.spawn(&args)?;
        let Some(out) = wait_with_timeout(session, timeout)? else {
            return Ok(None);
        };

        if !out.status.success() {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: format!("browser exited with {}: {}", out.status, last_line(&out.stderr)),
            });
        }
        if out.stdout.is_empty() {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: "browser returned an empty document".to_string(),
            });
        }
        Ok(Some(String::from_utf8_lossy(&out.stdout).into_owned()))
    }
}

impl Renderer for ChromeRenderer {
    fn render(&self, url: &str, readiness: &Readiness) -> Result<RenderedPage, RenderError> {
        info!("navigating to {url}");
        let html = self
            .dump_dom(url, readiness.settle_timeout)?
            .ok_or(RenderError::SettleTimeout(readiness.settle_timeout))?;

        if readiness.is_ready(&html) {
            return Ok(RenderedPage {
                url: url.to_string(),
                html,
            });
        }

        let started = Instant::now();
        loop {
            let remaining = readiness.readiness_timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(RenderError::ReadinessTimeout {
                    selector: readiness.selector.clone(),
                    waited: started.elapsed(),
                });
            }

            warn!(
                "`{}` not present yet; re-rendering ({:.1}s left)",
                readiness.selector,
                remaining.as_secs_f64()
            );
            std::thread::sleep(readiness.poll_interval.min(remaining));

            let remaining = readiness.readiness_timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                continue;
            }
            if let Some(html) = self.dump_dom(url, remaining)? {
                if readiness.is_ready(&html) {
                    return Ok(RenderedPage {
                        url: url.to_string(),
                        html,
                    });
                }
            }
        }
    }
}

fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Waits for the browser to exit, draining both pipes meanwhile so a chatty
/// process cannot block on a full buffer. `Ok(None)` on timeout; the session is
/// dropped (and the process killed) either way.
fn wait_with_timeout(
    mut session: BrowserSession,
    timeout: Duration,
) -> Result<Option<Captured>, RenderError> {
    let stdout_reader = session.child.stdout.take();
    let stderr_reader = session.child.stderr.take();

    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });

    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let start = Instant::now();
    loop {
        let status = session.child.try_wait().map_err(|source| RenderError::Wait {
            exe: session.exe.clone(),
            source,
        })?;

        if let Some(status) = status {
            let reader_failed = || RenderError::OutputReader {
                exe: session.exe.clone(),
            };
            let stdout = stdout_thread.join().map_err(|_| reader_failed())?;
            let stderr = stderr_thread.join().map_err(|_| reader_failed())?;
            return Ok(Some(Captured {
                status,
                stdout,
                stderr,
            }));
        }

        if start.elapsed() > timeout {
            warn!("browser {} timed out after {:?}", session.exe, timeout);
            drop(session);
            let _ = stdout_thread.join();
            let _ = stderr_thread.join();
            return Ok(None);
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
