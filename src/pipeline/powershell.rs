//! PowerPoint automation through a PowerShell-hosted COM session.
//!
//! Each [`PowerShellAutomation::launch`] spawns one PowerShell child that
//! reads commands from stdin (`-Command -`) and creates a
//! `PowerPoint.Application` COM object. Every later lifecycle step is one
//! line written to that child:
//!
//! ```text
//! try { <statement>; [Console]::Out.WriteLine('@@OK') }
//! catch { [Console]::Out.WriteLine('@@ERR ' + <message>) }
//! ```
//!
//! The reply is the first sentinel line read back; anything else the
//! statement prints is logged at DEBUG and skipped. Replies are read on a
//! dedicated thread so every step can be bounded by a timeout: PowerPoint
//! stuck on a modal dialog never answers, and the child is killed instead.
//!
//! Paths travel as base64-encoded UTF-8 and are decoded inside PowerShell, so
//! quotes, `$`, backticks and non-ASCII characters in file names need no
//! escaping and survive the console code page.

use crate::error::ConvertError;
use crate::pipeline::automation::{Application, Automation, Presentation};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Executable used when neither the config nor `PPT2PDF_POWERSHELL` names one.
pub const DEFAULT_POWERSHELL: &str = "powershell.exe";

/// Longest a single automation statement may take before the host is killed.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(300);

const OK_SENTINEL: &str = "@@OK";
const ERR_SENTINEL: &str = "@@ERR";

/// How long a child gets to exit after `exit` before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(10);

const LAUNCH_STMT: &str = "$app = New-Object -ComObject PowerPoint.Application";
const CLOSE_STMT: &str = "$deck.Close(); \
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($deck); \
    Remove-Variable deck";
const QUIT_STMT: &str = "$app.Quit(); \
    [void][Runtime.InteropServices.Marshal]::ReleaseComObject($app); \
    Remove-Variable app";

/// Drives PowerPoint through `powershell.exe`.
#[derive(Debug, Clone)]
pub struct PowerShellAutomation {
    exe: PathBuf,
    step_timeout: Duration,
}

impl PowerShellAutomation {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Bound every statement (launch, open, export, close, quit) by `timeout`.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Use `PPT2PDF_POWERSHELL` when set and non-empty, else [`DEFAULT_POWERSHELL`].
    pub fn from_env() -> Self {
        match std::env::var("PPT2PDF_POWERSHELL") {
            Ok(exe) if !exe.trim().is_empty() => Self::new(exe.trim()),
            _ => Self::new(DEFAULT_POWERSHELL),
        }
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }
}

impl Default for PowerShellAutomation {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Automation for PowerShellAutomation {
    fn launch(&self) -> Result<Box<dyn Application>, ConvertError> {
        let mut session = HostSession::spawn(&self.exe, self.step_timeout)?;
        session.run(LAUNCH_STMT, |detail| ConvertError::Launch { detail })?;
        Ok(Box::new(PowerShellApp {
            session: Arc::new(Mutex::new(session)),
        }))
    }

    fn name(&self) -> &str {
        "powershell"
    }
}

struct PowerShellApp {
    session: Arc<Mutex<HostSession>>,
}

impl Application for PowerShellApp {
    fn open(&mut self, path: &Path) -> Result<Box<dyn Presentation>, ConvertError> {
        // ReadOnly = msoTrue, Untitled = msoFalse, WithWindow = msoFalse
        let stmt = format!(
            "$deck = $app.Presentations.Open({}, -1, 0, 0)",
            ps_path_literal(path)
        );
        lock(&self.session)?.run(&stmt, |detail| ConvertError::Open { detail })?;
        Ok(Box::new(PowerShellDeck {
            session: Arc::clone(&self.session),
        }))
    }

    fn quit(&mut self) -> Result<(), ConvertError> {
        let mut session = lock(&self.session)?;
        if session.exited {
            return Ok(());
        }
        let result = session.run(QUIT_STMT, |detail| ConvertError::Host { detail });
        session.shutdown();
        result
    }
}

struct PowerShellDeck {
    session: Arc<Mutex<HostSession>>,
}

impl Presentation for PowerShellDeck {
    fn save_as(&mut self, path: &Path, format: i32) -> Result<(), ConvertError> {
        let stmt = format!("$deck.SaveAs({}, {})", ps_path_literal(path), format);
        lock(&self.session)?.run(&stmt, |detail| ConvertError::Export { detail })
    }

    fn close(&mut self) -> Result<(), ConvertError> {
        lock(&self.session)?.run(CLOSE_STMT, |detail| ConvertError::Close { detail })
    }
}

fn lock(session: &Mutex<HostSession>) -> Result<MutexGuard<'_, HostSession>, ConvertError> {
    session.lock().map_err(|_| ConvertError::Host {
        detail: "automation session lock poisoned".to_string(),
    })
}

/// What the reader thread hands back for each statement.
type Reply = Result<Result<(), String>, ConvertError>;

/// One PowerShell child, its stdin, and the replies read from its stdout.
struct HostSession {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<Reply>,
    step_timeout: Duration,
    exited: bool,
}

impl HostSession {
    fn spawn(exe: &Path, step_timeout: Duration) -> Result<Self, ConvertError> {
        let mut cmd = Command::new(exe);
        cmd.args([
            "-NoLogo",
            "-NoProfile",
            "-NonInteractive",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            "-",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|e| ConvertError::Launch {
            detail: format!("spawning {}: {}", exe.display(), e),
        })?;
        debug!("Spawned automation host {} (pid {})", exe.display(), child.id());

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                reap(&mut child);
                return Err(ConvertError::Launch {
                    detail: "automation host pipes unavailable".to_string(),
                });
            }
        };
        let replies = match spawn_reader(stdout) {
            Ok(replies) => replies,
            Err(e) => {
                reap(&mut child);
                return Err(ConvertError::Launch {
                    detail: format!("starting reply reader: {e}"),
                });
            }
        };

        Ok(Self {
            child,
            stdin,
            replies,
            step_timeout,
            exited: false,
        })
    }

    /// Run one statement; a PowerShell exception is mapped through `on_error`.
    fn run(
        &mut self,
        statement: &str,
        on_error: impl FnOnce(String) -> ConvertError,
    ) -> Result<(), ConvertError> {
        if self.exited {
            return Err(ConvertError::Host {
                detail: "automation host already exited".to_string(),
            });
        }
        let line = wrap_statement(statement);
        writeln!(self.stdin, "{line}")
            .and_then(|_| self.stdin.flush())
            .map_err(|e| ConvertError::Host {
                detail: format!("writing to automation host: {e}"),
            })?;

        match self.replies.recv_timeout(self.step_timeout) {
            Ok(reply) => reply?.map_err(on_error),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Automation host (pid {}) gave no reply within {:?}; killing it",
                    self.child.id(),
                    self.step_timeout
                );
                self.kill();
                Err(ConvertError::Host {
                    detail: format!(
                        "timed out after {:?} waiting for the automation host",
                        self.step_timeout
                    ),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(ConvertError::Host {
                detail: "automation host exited unexpectedly".to_string(),
            }),
        }
    }

    fn kill(&mut self) {
        reap(&mut self.child);
        self.exited = true;
    }

    /// Ask the child to exit, then reap it; kill it if it lingers.
    fn shutdown(&mut self) {
        if self.exited {
            return;
        }
        let _ = writeln!(self.stdin, "exit").and_then(|_| self.stdin.flush());

        let start = Instant::now();
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if start.elapsed() < EXIT_GRACE => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Ok(None) | Err(_) => {
                    warn!(
                        "Automation host (pid {}) did not exit within {:?}; killing it",
                        self.child.id(),
                        EXIT_GRACE
                    );
                    reap(&mut self.child);
                    break;
                }
            }
        }
        self.exited = true;
    }
}

impl Drop for HostSession {
    fn drop(&mut self) {
        if !self.exited {
            self.kill();
        }
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Forward one [`Reply`] per sentinel until stdout closes or the session
/// hangs up.
fn spawn_reader(stdout: ChildStdout) -> io::Result<Receiver<Reply>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("ppt2pdf-host-reader".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                let reply = read_reply(&mut reader);
                let closed = reply.is_err();
                if tx.send(reply).is_err() || closed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Wrap `statement` so it always answers with exactly one sentinel line.
fn wrap_statement(statement: &str) -> String {
    format!(
        "try {{ {statement}; [Console]::Out.WriteLine('{OK_SENTINEL}') }} \
         catch {{ [Console]::Out.WriteLine('{ERR_SENTINEL} ' + ($_.Exception.Message -replace '\\s+', ' ')) }}; \
         [Console]::Out.Flush()"
    )
}

/// PowerShell expression evaluating to `path` as a string.
fn ps_path_literal(path: &Path) -> String {
    let encoded = STANDARD.encode(path.to_string_lossy().as_bytes());
    format!("[Text.Encoding]::UTF8.GetString([Convert]::FromBase64String('{encoded}'))")
}

/// Read lines until a sentinel arrives.
///
/// The outer `Result` is a host failure (pipe closed, I/O error); the inner
/// one carries the PowerShell exception message.
fn read_reply<R: BufRead>(reader: &mut R) -> Result<Result<(), String>, ConvertError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| ConvertError::Host {
                detail: format!("reading from automation host: {e}"),
            })?;
        if n == 0 {
            return Err(ConvertError::Host {
                detail: "automation host exited unexpectedly".to_string(),
            });
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line == OK_SENTINEL {
            return Ok(Ok(()));
        }
        if let Some(message) = line.strip_prefix(ERR_SENTINEL) {
            let message = message.trim();
            let message = if message.is_empty() {
                "unknown PowerShell error"
            } else {
                message
            };
            return Ok(Err(message.to_string()));
        }
        if !line.is_empty() {
            debug!("powershell: {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reply_ok_skips_noise() {
        let mut r = Cursor::new("WARNING: slow\r\n\r\n@@OK\r\n@@ERR later\r\n");
        assert_eq!(read_reply(&mut r).unwrap(), Ok(()));
        assert_eq!(read_reply(&mut r).unwrap(), Err("later".to_string()));
    }

    #[test]
    fn reply_err_carries_message() {
        let mut r = Cursor::new("@@ERR PowerPoint could not open the file.\n");
        assert_eq!(
            read_reply(&mut r).unwrap(),
            Err("PowerPoint could not open the file.".to_string())
        );
    }

    #[test]
    fn reply_err_without_message() {
        let mut r = Cursor::new("@@ERR\n");
        assert_eq!(
            read_reply(&mut r).unwrap(),
            Err("unknown PowerShell error".to_string())
        );
    }

    #[test]
    fn reply_eof_is_host_error() {
        let mut r = Cursor::new("partial output\n");
        assert!(matches!(
            read_reply(&mut r),
            Err(ConvertError::Host { .. })
        ));
    }

    #[test]
    fn wrapped_statement_is_single_line() {
        let line = wrap_statement("$deck.Close()");
        assert!(!line.contains('\n'));
        assert!(line.starts_with("try { $deck.Close();"));
        assert!(line.contains("'@@OK'"));
        assert!(line.contains("'@@ERR '"));
        assert!(line.contains("'\\s+'"));
    }

    #[test]
    fn path_literal_round_trips_awkward_names() {
        let path = Path::new("C:\\Decks\\Q3 'final' $draft – ü.pptx");
        let literal = ps_path_literal(path);
        assert!(!literal.contains('$'));

        let start = literal.find("String('").unwrap() + "String('".len();
        let end = literal[start..].find('\'').unwrap() + start;
        let decoded = STANDARD.decode(&literal[start..end]).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), path.to_string_lossy());
    }

    #[test]
    fn missing_executable_is_launch_error() {
        let _spawning = spawn_lock();
        let auto = PowerShellAutomation::new("/definitely/not/powershell");
        match auto.launch() {
            Err(ConvertError::Launch { detail }) => {
                assert!(detail.contains("/definitely/not/powershell"), "got {detail}")
            }
            Err(other) => panic!("expected launch error, got {other}"),
            Ok(_) => panic!("launch should fail"),
        }
    }

    // ── Scripted hosts ───────────────────────────────────────────────────
    //
    // Small `sh` scripts stand in for PowerShell: they read one statement
    // per line, append it to `<script>.log`, and answer with sentinels.

    /// Serialises tests that write a script and then exec it; a concurrent
    /// fork holding the script's write handle makes exec fail with ETXTBSY.
    fn spawn_lock() -> MutexGuard<'static, ()> {
        static SPAWN: Mutex<()> = Mutex::new(());
        SPAWN.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(unix)]
    fn fake_host(dir: &Path, dispatch: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-host.sh");
        let script = format!(
            "#!/bin/sh\n\
             while IFS= read -r line; do\n\
               printf '%s\\n' \"$line\" >> \"$0.log\"\n\
               case \"$line\" in\n\
                 exit) exit 0 ;;\n\
                 {dispatch}\n\
               esac\n\
             done\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn host_log(host: &Path) -> Vec<String> {
        let log = format!("{}.log", host.display());
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn scripted_host_runs_full_lifecycle() {
        use crate::pipeline::converter::convert_task;
        use crate::pipeline::input::ConversionTask;

        let _spawning = spawn_lock();
        let dir = tempfile::tempdir().unwrap();
        let host = fake_host(dir.path(), "*) echo 'WARNING: chatter'; echo '@@OK' ;;");
        let task = ConversionTask::new(dir.path().join("talk.pptx"));

        let outcome = convert_task(&PowerShellAutomation::new(&host), &task);
        assert!(outcome.success, "{}", outcome.message);

        let log = host_log(&host);
        assert_eq!(log.len(), 6, "{log:#?}");
        assert!(log[0].contains("New-Object -ComObject PowerPoint.Application"));
        assert!(log[1].contains("$app.Presentations.Open("));
        assert!(log[2].contains("$deck.SaveAs(") && log[2].contains(", 32)"));
        assert!(log[3].contains("$deck.Close()"));
        assert!(log[4].contains("$app.Quit()"));
        assert_eq!(log[5], "exit");
    }

    #[cfg(unix)]
    #[test]
    fn scripted_host_error_maps_to_failed_step() {
        use crate::pipeline::converter::convert_task;
        use crate::pipeline::input::ConversionTask;

        let _spawning = spawn_lock();
        let dir = tempfile::tempdir().unwrap();
        let host = fake_host(
            dir.path(),
            "*Presentations.Open*) echo 'opening'; echo '@@ERR File is locked' ;;\n\
             *) echo '@@OK' ;;",
        );
        let task = ConversionTask::new(dir.path().join("locked.pptx"));

        let outcome = convert_task(&PowerShellAutomation::new(&host), &task);
        assert_eq!(
            outcome.error,
            Some(ConvertError::Open {
                detail: "File is locked".to_string()
            })
        );

        // No deck to close; the application is still quit and the host told to exit.
        let log = host_log(&host);
        assert_eq!(log.len(), 4, "{log:#?}");
        assert!(log[2].contains("$app.Quit()"));
        assert_eq!(log[3], "exit");
    }

    #[cfg(unix)]
    #[test]
    fn silent_host_times_out_at_launch() {
        let _spawning = spawn_lock();
        let dir = tempfile::tempdir().unwrap();
        let host = fake_host(dir.path(), "*) ;;");

        let start = Instant::now();
        let auto = PowerShellAutomation::new(&host).with_step_timeout(Duration::from_millis(200));
        match auto.launch() {
            Err(ConvertError::Host { detail }) => assert!(detail.contains("timed out"), "{detail}"),
            Err(other) => panic!("expected host timeout, got {other}"),
            Ok(_) => panic!("launch should time out"),
        }
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn export_that_never_answers_still_produces_outcome() {
        use crate::pipeline::converter::convert_task;
        use crate::pipeline::input::ConversionTask;

        let _spawning = spawn_lock();
        let dir = tempfile::tempdir().unwrap();
        let host = fake_host(dir.path(), "*SaveAs*) ;;\n*) echo '@@OK' ;;");
        let task = ConversionTask::new(dir.path().join("stuck.pptx"));
        let auto = PowerShellAutomation::new(&host).with_step_timeout(Duration::from_millis(300));

        let start = Instant::now();
        let outcome = convert_task(&auto, &task);
        assert!(!outcome.success);
        assert!(
            matches!(outcome.error, Some(ConvertError::Host { ref detail }) if detail.contains("timed out")),
            "{:?}",
            outcome.error
        );
        assert!(start.elapsed() < Duration::from_secs(10));

        // The killed host never saw close, quit or exit.
        let log = host_log(&host);
        assert_eq!(log.len(), 3, "{log:#?}");
    }
}
