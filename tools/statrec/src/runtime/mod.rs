use crate::errors::RecorderError;
use crate::routing::DestinationGroup;
use crate::types::OutputDestination;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

/// Writes committed text to the files behind a destination group.
pub trait Persistence: Send + Sync {
    fn write_to_file(&self, group: &DestinationGroup, text: &str) -> Result<(), RecorderError>;
}

/// Read accessors over the job's settings. Never mutated by the recorder.
pub trait Configuration: Send + Sync {
    fn job_name(&self) -> Result<String, RecorderError>;
    fn setting(&self, name: &str) -> Option<String>;
    fn setting_names(&self) -> Vec<String>;
    fn settings_file(&self) -> Result<String, RecorderError>;
    fn input_dir(&self) -> Result<PathBuf, RecorderError>;
    fn warnings(&self) -> Vec<String>;
    fn memory_diagnostics(&self) -> bool;
    fn thread_label(&self) -> Option<String>;

    fn compile_warnings(&self) -> Result<String, RecorderError> {
        let mut out = String::new();
        for (idx, warning) in self.warnings().iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", idx + 1, warning));
        }
        Ok(out)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

pub trait MemoryProbe: Send + Sync {
    fn sample(&self) -> Result<MemorySample, RecorderError>;
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

pub struct ProductionMemoryProbe;

impl MemoryProbe for ProductionMemoryProbe {
    fn sample(&self) -> Result<MemorySample, RecorderError> {
        let status = fs::read_to_string("/proc/self/status")
            .map_err(|e| RecorderError::Collaborator(format!("memory statistics unavailable: {e}")))?;
        parse_proc_status(&status)
    }
}

/// Reads `VmRSS` and `VmSize` from `/proc/self/status`. The kernel reports
/// both in kB whatever the page size.
fn parse_proc_status(status: &str) -> Result<MemorySample, RecorderError> {
    let field = |name: &str| -> Result<u64, RecorderError> {
        status
            .lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kib| kib.parse::<u64>().ok())
            .map(|kib| kib.saturating_mul(1024))
            .ok_or_else(|| RecorderError::Collaborator(format!("{name} missing from proc status")))
    };
    Ok(MemorySample {
        resident_bytes: field("VmRSS")?,
        virtual_bytes: field("VmSize")?,
    })
}

/// Appends committed text to one file per destination under `output_dir`.
pub struct FilePersistence {
    files: BTreeMap<OutputDestination, PathBuf>,
    write_lock: Mutex<()>,
}

impl FilePersistence {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        let dir = output_dir.as_ref();
        Self::with_files(
            dir.join("results.log"),
            dir.join("summary.log"),
            dir.join("trace.log"),
        )
    }

    pub fn with_files(
        results: impl Into<PathBuf>,
        summary: impl Into<PathBuf>,
        trace: impl Into<PathBuf>,
    ) -> Self {
        let mut files = BTreeMap::new();
        files.insert(OutputDestination::Results, results.into());
        files.insert(OutputDestination::Summary, summary.into());
        files.insert(OutputDestination::Trace, trace.into());
        Self {
            files,
            write_lock: Mutex::new(()),
        }
    }

    fn open_append(&self, destination: OutputDestination) -> Result<(&Path, File), RecorderError> {
        let path = self.files.get(&destination).ok_or_else(|| {
            RecorderError::Io(format!("no file bound to {}", destination.as_str()))
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RecorderError::Io(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| RecorderError::Io(format!("{}: {e}", path.display())))?;
        Ok((path.as_path(), file))
    }
}

impl Persistence for FilePersistence {
    /// Every file in the group is opened before any is written, so a missing
    /// or unwritable destination fails the commit with nothing delivered.
    fn write_to_file(&self, group: &DestinationGroup, text: &str) -> Result<(), RecorderError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let opened = group
            .destinations()
            .iter()
            .map(|destination| self.open_append(*destination))
            .collect::<Result<Vec<_>, _>>()?;
        for (path, mut file) in opened {
            file.write_all(text.as_bytes())
                .map_err(|e| RecorderError::Io(format!("{}: {e}", path.display())))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCall {
    pub group: &'static str,
    pub destinations: Vec<OutputDestination>,
    pub text: String,
}

#[derive(Default, Clone)]
pub struct FakePersistence {
    calls: Arc<Mutex<Vec<CommitCall>>>,
    fail_next: Arc<Mutex<Option<RecorderError>>>,
}

impl FakePersistence {
    pub fn set_fail_next(&self, error: RecorderError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn calls(&self) -> Vec<CommitCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn texts_for(&self, destination: OutputDestination) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.destinations.contains(&destination))
            .map(|call| call.text)
            .collect()
    }
}

impl Persistence for FakePersistence {
    fn write_to_file(&self, group: &DestinationGroup, text: &str) -> Result<(), RecorderError> {
        if let Some(err) = self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(err);
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CommitCall {
                group: group.name(),
                destinations: group.destinations().to_vec(),
                text: text.to_string(),
            });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakeConfiguration {
    pub job_name: String,
    pub settings_file: String,
    pub input_dir: PathBuf,
    pub warnings: Vec<String>,
    pub memory_diagnostics: bool,
    pub thread_label: Option<String>,
    pub settings: BTreeMap<String, String>,
    pub fail_settings_file: bool,
}

impl Default for FakeConfiguration {
    fn default() -> Self {
        Self {
            job_name: "fake-job".to_string(),
            settings_file: "settings.toml".to_string(),
            input_dir: PathBuf::from("/data/input"),
            warnings: Vec::new(),
            memory_diagnostics: false,
            thread_label: None,
            settings: BTreeMap::new(),
            fail_settings_file: false,
        }
    }
}

impl Configuration for FakeConfiguration {
    fn job_name(&self) -> Result<String, RecorderError> {
        Ok(self.job_name.clone())
    }

    fn setting(&self, name: &str) -> Option<String> {
        self.settings.get(name).cloned()
    }

    fn setting_names(&self) -> Vec<String> {
        self.settings.keys().cloned().collect()
    }

    fn settings_file(&self) -> Result<String, RecorderError> {
        if self.fail_settings_file {
            return Err(RecorderError::Collaborator(
                "settings file name unavailable".to_string(),
            ));
        }
        Ok(self.settings_file.clone())
    }

    fn input_dir(&self) -> Result<PathBuf, RecorderError> {
        Ok(self.input_dir.clone())
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.clone()
    }

    fn memory_diagnostics(&self) -> bool {
        self.memory_diagnostics
    }

    fn thread_label(&self) -> Option<String> {
        self.thread_label.clone()
    }
}

#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<SystemTime>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default, Clone)]
pub struct FakeMemoryProbe {
    pub sample: Option<MemorySample>,
}

impl MemoryProbe for FakeMemoryProbe {
    fn sample(&self) -> Result<MemorySample, RecorderError> {
        self.sample
            .ok_or_else(|| RecorderError::Collaborator("memory statistics unavailable".to_string()))
    }
}
