//! Configuration types for batch conversion.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. The config is cheap to clone: the automation
//! backend, progress callback and cancel flag are shared handles, so a GUI
//! can keep a clone of the cancel flag while the batch runs elsewhere.

use crate::error::Ppt2PdfError;
use crate::pipeline::automation::Automation;
use crate::pipeline::powershell::{PowerShellAutomation, DEFAULT_STEP_TIMEOUT};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default number of presentations converted at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Configuration for one batch run.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use ppt2pdf::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Maximum simultaneously running conversions. Default: 4.
    ///
    /// Every running conversion owns a PowerPoint instance. PowerPoint is a
    /// heavyweight, host-wide resource, and launching many instances at
    /// once makes it slow and unstable.
    pub concurrency: usize,

    /// Pre-constructed automation backend. Takes precedence over `powershell_exe`.
    pub automation: Option<Arc<dyn Automation>>,

    /// PowerShell executable for the default backend.
    /// If None, uses `PPT2PDF_POWERSHELL` or `powershell.exe`.
    pub powershell_exe: Option<PathBuf>,

    /// Longest one automation step may take before its host is killed and
    /// the file fails. Applies to the PowerShell backend. Default: 5 minutes.
    pub step_timeout: Duration,

    /// Receives message/progress/finished events. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation, checked between drained outcomes.
    pub cancel_flag: CancelFlag,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            automation: None,
            powershell_exe: None,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            progress_callback: None,
            cancel_flag: CancelFlag::new(),
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("concurrency", &self.concurrency)
            .field(
                "automation",
                &self.automation.as_ref().map(|a| a.name().to_string()),
            )
            .field("powershell_exe", &self.powershell_exe)
            .field("step_timeout", &self.step_timeout)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("cancel_flag", &self.cancel_flag)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the automation backend, from most-specific to least-specific:
    ///
    /// 1. **Pre-built backend** (`automation`) — used as-is (tests, custom hosts).
    /// 2. **Named executable** (`powershell_exe`).
    /// 3. **Environment** (`PPT2PDF_POWERSHELL`), else `powershell.exe`.
    pub fn resolve_automation(&self) -> Arc<dyn Automation> {
        if let Some(ref automation) = self.automation {
            return Arc::clone(automation);
        }
        let backend = match self.powershell_exe {
            Some(ref exe) => PowerShellAutomation::new(exe.clone()),
            None => PowerShellAutomation::from_env(),
        };
        Arc::new(backend.with_step_timeout(self.step_timeout))
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    /// Values below 1 are raised to 1.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn automation(mut self, automation: Arc<dyn Automation>) -> Self {
        self.config.automation = Some(automation);
        self
    }

    pub fn powershell_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.config.powershell_exe = Some(exe.into());
        self
    }

    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.config.step_timeout = timeout;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.config.cancel_flag = flag;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Ppt2PdfError> {
        let c = &self.config;
        if c.step_timeout.is_zero() {
            return Err(Ppt2PdfError::InvalidConfig(
                "Step timeout must be greater than zero".into(),
            ));
        }
        if let Some(ref exe) = c.powershell_exe {
            if exe.as_os_str().is_empty() {
                return Err(Ppt2PdfError::InvalidConfig(
                    "PowerShell executable path is empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

/// Shared cooperative-cancellation flag.
///
/// Clones observe the same flag. Setting it never interrupts a running
/// conversion; the batch stops at the next drained outcome.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CancelFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelFlag")
            .field(&self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = BatchConfig::default();
        assert_eq!(c.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(c.step_timeout, DEFAULT_STEP_TIMEOUT);
        assert!(c.automation.is_none());
        assert!(!c.cancel_flag.is_cancelled());
    }

    #[test]
    fn concurrency_is_clamped() {
        let c = BatchConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_step_timeout_rejected() {
        let err = BatchConfig::builder()
            .step_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Ppt2PdfError::InvalidConfig(_)));

        let c = BatchConfig::builder()
            .step_timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        assert_eq!(c.step_timeout, Duration::from_secs(30));
        assert!(format!("{c:?}").contains("30s"));
    }

    #[test]
    fn empty_powershell_path_rejected() {
        let err = BatchConfig::builder().powershell_exe("").build().unwrap_err();
        assert!(matches!(err, Ppt2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn named_executable_is_used() {
        let c = BatchConfig::builder()
            .powershell_exe("pwsh")
            .build()
            .unwrap();
        assert_eq!(c.resolve_automation().name(), "powershell");
        assert!(format!("{c:?}").contains("pwsh"));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let config = BatchConfig::builder()
            .cancel_flag(flag.clone())
            .build()
            .unwrap();
        let copy = config.clone();
        flag.cancel();
        assert!(config.cancel_flag.is_cancelled());
        assert!(copy.cancel_flag.is_cancelled());
    }
}
