//! Builds the preamble written at the start of a run: job identity, the
//! settings that produced it, accumulated warnings and, on request, a memory
//! snapshot. Every line is `LABEL_WIDTH` left-justified label followed by a
//! right-justified value, framed by dashed rules of `RULE_WIDTH`.

use crate::errors::RecorderError;
use crate::runtime::{Clock, Configuration, MemoryProbe};
use crate::types::TimeFormat;
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const RULE_WIDTH: usize = 72;
pub const LABEL_WIDTH: usize = 24;
const SIGNATURE_BYTES: usize = 6;
const MIB: f64 = 1024.0 * 1024.0;

pub struct ComposeInputs<'a> {
    pub configuration: &'a dyn Configuration,
    pub clock: &'a dyn Clock,
    pub memory: &'a dyn MemoryProbe,
    pub time_format: TimeFormat,
    pub started_at: SystemTime,
}

pub fn compose(inputs: &ComposeInputs<'_>) -> Result<String, RecorderError> {
    let cfg = inputs.configuration;
    let job_name = cfg.job_name()?;
    let settings_file = cfg.settings_file()?;
    let input_dir = cfg.input_dir()?.display().to_string();

    let mut out = String::new();
    out.push_str(&rule());
    out.push_str(&justified("Job", &job_name));
    out.push_str(&justified(
        "Signature",
        &job_signature(&job_name, &settings_file, &input_dir),
    ));
    out.push_str(&justified(
        "Started",
        &format_timestamp(inputs.clock.now(), inputs.started_at, inputs.time_format),
    ));
    out.push_str(&justified("Settings file", &settings_file));
    out.push_str(&justified("Input directory", &input_dir));
    if let Some(label) = cfg.thread_label() {
        out.push_str(&justified("Thread", &label));
    }
    out.push_str(&rule());

    let names = cfg.setting_names();
    if !names.is_empty() {
        out.push_str("Settings:\n");
        for name in names {
            let value = cfg.setting(&name).ok_or_else(|| {
                RecorderError::Collaborator(format!("setting {name} has no value"))
            })?;
            out.push_str(&justified(&format!("  {name}"), &value));
        }
        out.push_str(&rule());
    }

    if !cfg.warnings().is_empty() {
        out.push_str("Warnings:\n");
        out.push_str(&cfg.compile_warnings()?);
        out.push_str(&rule());
    }

    if cfg.memory_diagnostics() {
        let sample = inputs.memory.sample()?;
        out.push_str("Memory diagnostics:\n");
        out.push_str(&justified(
            "Resident",
            &format!("{:.1} MiB", sample.resident_bytes as f64 / MIB),
        ));
        out.push_str(&justified(
            "Virtual",
            &format!("{:.1} MiB", sample.virtual_bytes as f64 / MIB),
        ));
        out.push_str(&rule());
    }

    Ok(out)
}

pub fn rule() -> String {
    let mut line = "-".repeat(RULE_WIDTH);
    line.push('\n');
    line
}

pub fn justified(label: &str, value: &str) -> String {
    format!(
        "{name:<lw$}{value:>vw$}\n",
        name = format!("{label}:"),
        lw = LABEL_WIDTH,
        vw = RULE_WIDTH - LABEL_WIDTH
    )
}

pub fn job_signature(job_name: &str, settings_file: &str, input_dir: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{job_name}\n{settings_file}\n{input_dir}\n").as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(SIGNATURE_BYTES * 2);
    for byte in &digest[..SIGNATURE_BYTES] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

pub fn format_timestamp(at: SystemTime, started_at: SystemTime, format: TimeFormat) -> String {
    let utc: DateTime<Utc> = at.into();
    match format {
        TimeFormat::Iso8601 => utc.to_rfc3339_opts(SecondsFormat::Secs, true),
        TimeFormat::Rfc2822 => utc.to_rfc2822(),
        TimeFormat::UnixSeconds => at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            .to_string(),
        TimeFormat::Elapsed => format_elapsed(at.duration_since(started_at).unwrap_or_default()),
    }
}

/// `HH:MM:SS.mmm`; hours grow past two digits rather than wrapping.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        elapsed.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{FakeClock, FakeConfiguration, FakeMemoryProbe, MemorySample};

    fn inputs<'a>(
        cfg: &'a FakeConfiguration,
        clock: &'a FakeClock,
        memory: &'a FakeMemoryProbe,
    ) -> ComposeInputs<'a> {
        ComposeInputs {
            configuration: cfg,
            clock,
            memory,
            time_format: TimeFormat::UnixSeconds,
            started_at: UNIX_EPOCH,
        }
    }

    #[test]
    fn plain_configuration_has_settings_lines_and_no_optional_blocks() {
        let cfg = FakeConfiguration::default();
        let clock = FakeClock::default();
        let memory = FakeMemoryProbe::default();

        let text = compose(&inputs(&cfg, &clock, &memory)).expect("compose");
        assert!(text.contains("Settings file:"));
        assert!(text.contains("settings.toml"));
        assert!(text.contains("Input directory:"));
        assert!(text.contains("/data/input"));
        assert!(!text.contains("Warnings:"));
        assert!(!text.contains("Memory diagnostics:"));
        assert!(!text.contains("Thread:"));
    }

    #[test]
    fn warnings_block_lists_every_warning_after_header() {
        let cfg = FakeConfiguration {
            warnings: vec!["seed not set".to_string(), "tiny population".to_string()],
            ..FakeConfiguration::default()
        };
        let clock = FakeClock::default();
        let memory = FakeMemoryProbe::default();

        let text = compose(&inputs(&cfg, &clock, &memory)).expect("compose");
        let header = text.find("Warnings:").expect("warnings header");
        let first = text.find("seed not set").expect("first warning");
        let second = text.find("tiny population").expect("second warning");
        assert!(header < first && first < second);
    }

    #[test]
    fn memory_block_appears_only_when_enabled() {
        let cfg = FakeConfiguration {
            memory_diagnostics: true,
            thread_label: Some("worker-3".to_string()),
            ..FakeConfiguration::default()
        };
        let clock = FakeClock::default();
        let memory = FakeMemoryProbe {
            sample: Some(MemorySample {
                resident_bytes: 3 * 1024 * 1024,
                virtual_bytes: 10 * 1024 * 1024,
            }),
        };

        let text = compose(&inputs(&cfg, &clock, &memory)).expect("compose");
        assert!(text.contains("Memory diagnostics:"));
        assert!(text.contains("3.0 MiB"));
        assert!(text.contains("10.0 MiB"));
        assert!(text.contains("worker-3"));
    }

    #[test]
    fn settings_are_echoed_in_name_order() {
        let mut cfg = FakeConfiguration::default();
        cfg.settings.insert("population".to_string(), "50".to_string());
        cfg.settings.insert("mutation".to_string(), "swap".to_string());
        let clock = FakeClock::default();
        let memory = FakeMemoryProbe::default();

        let text = compose(&inputs(&cfg, &clock, &memory)).expect("compose");
        let header = text.find("Settings:\n").expect("settings header");
        let mutation = text.find("  mutation:").expect("mutation line");
        let population = text.find("  population:").expect("population line");
        assert!(header < mutation && mutation < population);
    }

    #[test]
    fn collaborator_failures_propagate() {
        let cfg = FakeConfiguration {
            fail_settings_file: true,
            ..FakeConfiguration::default()
        };
        let clock = FakeClock::default();
        let memory = FakeMemoryProbe::default();
        assert!(matches!(
            compose(&inputs(&cfg, &clock, &memory)),
            Err(RecorderError::Collaborator(_))
        ));

        let cfg = FakeConfiguration {
            memory_diagnostics: true,
            ..FakeConfiguration::default()
        };
        assert!(compose(&inputs(&cfg, &clock, &memory)).is_err());
    }

    #[test]
    fn lines_are_fixed_width() {
        assert_eq!(rule().trim_end().len(), RULE_WIDTH);
        let line = justified("Job", "anneal");
        assert_eq!(line.trim_end_matches('\n').len(), RULE_WIDTH);
        assert!(line.starts_with("Job:"));
        assert!(line.trim_end().ends_with("anneal"));
    }

    #[test]
    fn timestamps_follow_the_time_format() {
        let start = UNIX_EPOCH + Duration::from_secs(86_400);
        let at = start + Duration::from_millis(3_723_045);
        assert_eq!(format_timestamp(at, start, TimeFormat::Elapsed), "01:02:03.045");
        assert_eq!(format_timestamp(start, start, TimeFormat::UnixSeconds), "86400");
        assert_eq!(
            format_timestamp(start, start, TimeFormat::Iso8601),
            "1970-01-02T00:00:00Z"
        );
        assert!(format_timestamp(start, start, TimeFormat::Rfc2822).starts_with("Fri, 2 Jan 1970"));
    }

    #[test]
    fn signature_is_stable_and_input_sensitive() {
        let a = job_signature("job", "s.toml", "/in");
        assert_eq!(a.len(), 12);
        assert_eq!(a, job_signature("job", "s.toml", "/in"));
        assert_ne!(a, job_signature("job", "s.toml", "/other"));
    }
}
