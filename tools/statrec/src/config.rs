use crate::errors::RecorderError;
use crate::runtime::{Configuration, FilePersistence};
use crate::types::{PolicyKind, TimeFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULTS_LABEL: &str = "(built-in defaults)";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub policy: Option<PolicyKind>,
    pub time_format: Option<TimeFormat>,
    pub memory_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub job: JobConfig,
    pub recorder: RecorderConfig,
    pub output: OutputConfig,
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobConfig {
    pub name: String,
    pub input_dir: PathBuf,
    pub thread_label: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecorderConfig {
    pub policy: PolicyKind,
    pub time_format: TimeFormat,
    pub memory_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub results_file: String,
    pub summary_file: String,
    pub trace_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            job: JobConfig {
                name: "statrec-job".to_string(),
                input_dir: PathBuf::from("."),
                thread_label: None,
                warnings: Vec::new(),
            },
            recorder: RecorderConfig {
                policy: PolicyKind::Standard,
                time_format: TimeFormat::Iso8601,
                memory_diagnostics: false,
            },
            output: OutputConfig {
                dir: PathBuf::from("statrec-out"),
                results_file: "results.log".to_string(),
                summary_file: "summary.log".to_string(),
                trace_file: "trace.log".to_string(),
            },
            settings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialAppConfig {
    job: Option<PartialJobConfig>,
    recorder: Option<PartialRecorderConfig>,
    output: Option<PartialOutputConfig>,
    settings: Option<BTreeMap<String, toml::Value>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialJobConfig {
    name: Option<String>,
    input_dir: Option<PathBuf>,
    thread_label: Option<String>,
    warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialRecorderConfig {
    policy: Option<PolicyKind>,
    time_format: Option<TimeFormat>,
    memory_diagnostics: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialOutputConfig {
    dir: Option<PathBuf>,
    results_file: Option<String>,
    summary_file: Option<String>,
    trace_file: Option<String>,
}

/// Loaded settings plus the paths they were resolved against. This is the
/// production `Configuration` handed to a recording session.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub config: AppConfig,
    pub config_path: Option<PathBuf>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    warnings: Vec<String>,
}

impl JobSettings {
    pub fn persistence(&self) -> FilePersistence {
        FilePersistence::with_files(
            self.output_dir.join(&self.config.output.results_file),
            self.output_dir.join(&self.config.output.summary_file),
            self.output_dir.join(&self.config.output.trace_file),
        )
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.output_dir.join("statrec-run.jsonl")
    }
}

impl Configuration for JobSettings {
    fn job_name(&self) -> Result<String, RecorderError> {
        Ok(self.config.job.name.clone())
    }

    fn setting(&self, name: &str) -> Option<String> {
        self.config.settings.get(name).cloned()
    }

    fn setting_names(&self) -> Vec<String> {
        self.config.settings.keys().cloned().collect()
    }

    fn settings_file(&self) -> Result<String, RecorderError> {
        match &self.config_path {
            Some(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .ok_or_else(|| {
                    RecorderError::Collaborator(format!(
                        "settings path has no file name: {}",
                        path.display()
                    ))
                }),
            None => Ok(DEFAULTS_LABEL.to_string()),
        }
    }

    fn input_dir(&self) -> Result<PathBuf, RecorderError> {
        Ok(self.input_dir.clone())
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.clone()
    }

    fn memory_diagnostics(&self) -> bool {
        self.config.recorder.memory_diagnostics
    }

    fn thread_label(&self) -> Option<String> {
        self.config.job.thread_label.clone()
    }
}

pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
) -> Result<JobSettings, RecorderError> {
    let mut cfg = AppConfig::default();
    let config_path = overrides
        .config_path
        .as_ref()
        .map(|path| absolutize_path(process_cwd, path));

    if let Some(path) = &config_path {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RecorderError::Io(format!("{}: {e}", path.display())))?;
        merge_partial_config(&mut cfg, parse_partial(&text)?);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;

    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent())
        .unwrap_or(process_cwd);
    let input_dir = absolutize_path(config_dir, &cfg.job.input_dir);
    let output_dir = match &overrides.output_dir {
        Some(dir) => absolutize_path(process_cwd, dir),
        None => absolutize_path(config_dir, &cfg.output.dir),
    };

    let mut warnings = cfg.job.warnings.clone();
    if !input_dir.is_dir() {
        warnings.push(format!(
            "input directory {} does not exist",
            input_dir.display()
        ));
    }

    Ok(JobSettings {
        config: cfg,
        config_path,
        input_dir,
        output_dir,
        warnings,
    })
}

pub fn parse_config(text: &str) -> Result<AppConfig, RecorderError> {
    let mut cfg = AppConfig::default();
    merge_partial_config(&mut cfg, parse_partial(text)?);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn parse_partial(text: &str) -> Result<PartialAppConfig, RecorderError> {
    toml::from_str(text).map_err(|e| RecorderError::ConfigParse(e.to_string()))
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(job) = partial.job {
        if let Some(name) = job.name {
            cfg.job.name = name;
        }
        if let Some(input_dir) = job.input_dir {
            cfg.job.input_dir = input_dir;
        }
        if let Some(label) = job.thread_label {
            cfg.job.thread_label = Some(label);
        }
        if let Some(warnings) = job.warnings {
            cfg.job.warnings = warnings;
        }
    }

    if let Some(recorder) = partial.recorder {
        if let Some(policy) = recorder.policy {
            cfg.recorder.policy = policy;
        }
        if let Some(time_format) = recorder.time_format {
            cfg.recorder.time_format = time_format;
        }
        if let Some(value) = recorder.memory_diagnostics {
            cfg.recorder.memory_diagnostics = value;
        }
    }

    if let Some(output) = partial.output {
        if let Some(dir) = output.dir {
            cfg.output.dir = dir;
        }
        if let Some(value) = output.results_file {
            cfg.output.results_file = value;
        }
        if let Some(value) = output.summary_file {
            cfg.output.summary_file = value;
        }
        if let Some(value) = output.trace_file {
            cfg.output.trace_file = value;
        }
    }

    if let Some(settings) = partial.settings {
        for (key, value) in settings {
            let rendered = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            cfg.settings.insert(key, rendered);
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(policy) = overrides.policy {
        cfg.recorder.policy = policy;
    }
    if let Some(time_format) = overrides.time_format {
        cfg.recorder.time_format = time_format;
    }
    if overrides.memory_diagnostics {
        cfg.recorder.memory_diagnostics = true;
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), RecorderError> {
    if cfg.job.name.trim().is_empty() {
        return Err(RecorderError::InvalidConfig(
            "job.name must not be empty".to_string(),
        ));
    }

    let files = [
        ("output.results_file", &cfg.output.results_file),
        ("output.summary_file", &cfg.output.summary_file),
        ("output.trace_file", &cfg.output.trace_file),
    ];
    for (key, value) in files {
        if value.trim().is_empty() {
            return Err(RecorderError::InvalidConfig(format!(
                "{key} must not be empty"
            )));
        }
    }
    for (idx, (key, value)) in files.iter().enumerate() {
        if let Some((other, _)) = files[idx + 1..].iter().find(|(_, v)| v == value) {
            return Err(RecorderError::InvalidConfig(format!(
                "{key} and {other} both name {value}"
            )));
        }
    }

    Ok(())
}
