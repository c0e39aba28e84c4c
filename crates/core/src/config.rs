//! Configuration file data model and parser.
//!
//! The grammar is a thin, line-oriented format — no nested sections, no
//! quoting — so the parser is a single forward pass rather than a full
//! lexer/grammar crate.

use crate::error::ConfigError;
use std::fmt;
use tracing::debug;

/// One of the five supported CPU scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CpuSchedCode {
    /// Shortest job first, non-preemptive.
    SjfN,
    /// Shortest remaining time first, preemptive.
    SrtfP,
    /// First come first served, preemptive (I/O does not block the CPU).
    FcfsP,
    /// Round robin, preemptive.
    RrP,
    /// First come first served, non-preemptive.
    FcfsN,
}

impl CpuSchedCode {
    fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "sjf-n" => Some(Self::SjfN),
            "srtf-p" => Some(Self::SrtfP),
            "fcfs-p" => Some(Self::FcfsP),
            "rr-p" => Some(Self::RrP),
            "fcfs-n" => Some(Self::FcfsN),
            _ => None,
        }
    }

    /// Whether this policy lets a `dev` opcode return control to the scheduler
    /// instead of blocking the CPU until the I/O completes.
    #[must_use]
    pub fn is_preemptive(self) -> bool {
        matches!(self, Self::SrtfP | Self::FcfsP | Self::RrP)
    }
}

impl fmt::Display for CpuSchedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SjfN => "SJF-N",
            Self::SrtfP => "SRTF-P",
            Self::FcfsP => "FCFS-P",
            Self::RrP => "RR-P",
            Self::FcfsN => "FCFS-N",
        };
        f.write_str(s)
    }
}

/// Log destination selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LogTo {
    /// Console only.
    Monitor,
    /// Log file only.
    File,
    /// Both console and log file.
    Both,
}

impl LogTo {
    fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "monitor" => Some(Self::Monitor),
            "file" => Some(Self::File),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

impl fmt::Display for LogTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Monitor => "Monitor",
            Self::File => "File",
            Self::Both => "Both",
        };
        f.write_str(s)
    }
}

/// Fully parsed and validated configuration file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigData {
    /// `Version/Phase`, 0.00-10.00.
    pub version_phase: f64,
    /// `File Path` — path to the metadata file, relative to the working directory.
    pub metadata_path: String,
    /// `CPU Scheduling Code`.
    pub cpu_sched_code: CpuSchedCode,
    /// `Quantum Time (cycles)`, 0-100. Only consulted under RR-P.
    pub quantum_cycles: u32,
    /// `Memory Display (On/Off)`, forced off when `log_to == LogTo::File`.
    pub mem_display: bool,
    /// `Memory Available (KB)`, 1024-102400.
    pub mem_available: u32,
    /// `Processor Cycle Time (msec)`, 1-100.
    pub proc_cycle_time: u32,
    /// `I/O Cycle Time (msec)`, 1-1000.
    pub io_cycle_time: u32,
    /// `Log To`.
    pub log_to: LogTo,
    /// `Log File Path`, meaningful when `log_to` is `File` or `Both`.
    pub log_file_path: String,
}

#[derive(Default)]
struct Builder {
    version_phase: Option<f64>,
    metadata_path: Option<String>,
    cpu_sched_code: Option<CpuSchedCode>,
    quantum_cycles: Option<u32>,
    mem_display: Option<bool>,
    mem_available: Option<u32>,
    proc_cycle_time: Option<u32>,
    io_cycle_time: Option<u32>,
    log_to: Option<LogTo>,
    log_file_path: Option<String>,
}

const LEADER: &str = "Start Simulator Configuration File:";
const TRAILER: &str = "End Simulator Configuration File.";

/// Parses the full text of a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] on a missing/malformed leader or trailer, an
/// unrecognized prompt, or a value outside its declared range or enum.
pub fn parse(text: &str) -> Result<ConfigData, ConfigError> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    debug!(lines = lines.len(), "parsing configuration file");

    let (first, rest) = lines.split_first().ok_or(ConfigError::BadLeader)?;
    if *first != LEADER {
        return Err(ConfigError::BadLeader);
    }
    let (last, interior) = rest.split_last().ok_or(ConfigError::BadTrailer)?;
    if *last != TRAILER {
        return Err(ConfigError::BadTrailer);
    }

    let mut builder = Builder::default();
    for line in interior {
        apply_prompt(&mut builder, line)?;
    }

    let cpu_sched_code = builder
        .cpu_sched_code
        .ok_or_else(|| out_of_range("CPU Scheduling Code"))?;
    let log_to = builder.log_to.ok_or_else(|| out_of_range("Log To"))?;
    let mut mem_display = builder.mem_display.ok_or_else(|| out_of_range("Memory Display (On/Off)"))?;
    if log_to == LogTo::File {
        mem_display = false;
    }

    Ok(ConfigData {
        version_phase: builder.version_phase.ok_or_else(|| out_of_range("Version/Phase"))?,
        metadata_path: builder.metadata_path.ok_or_else(|| out_of_range("File Path"))?,
        cpu_sched_code,
        quantum_cycles: builder
            .quantum_cycles
            .ok_or_else(|| out_of_range("Quantum Time (cycles)"))?,
        mem_display,
        mem_available: builder
            .mem_available
            .ok_or_else(|| out_of_range("Memory Available (KB)"))?,
        proc_cycle_time: builder
            .proc_cycle_time
            .ok_or_else(|| out_of_range("Processor Cycle Time (msec)"))?,
        io_cycle_time: builder.io_cycle_time.ok_or_else(|| out_of_range("I/O Cycle Time (msec)"))?,
        log_to,
        log_file_path: builder.log_file_path.ok_or_else(|| out_of_range("Log File Path"))?,
    })
}

fn out_of_range(prompt: &str) -> ConfigError {
    ConfigError::OutOfRange {
        prompt: prompt.to_string(),
    }
}

fn apply_prompt(builder: &mut Builder, line: &str) -> Result<(), ConfigError> {
    let (prompt, value) = line.split_once(':').ok_or_else(|| ConfigError::UnknownPrompt {
        prompt: line.to_string(),
    })?;
    let prompt = prompt.trim();
    let value = value.trim();

    match prompt {
        "Version/Phase" => {
            let v: f64 = value.parse().map_err(|_| out_of_range(prompt))?;
            if !(0.0..=10.0).contains(&v) {
                return Err(out_of_range(prompt));
            }
            builder.version_phase = Some(v);
        }
        "File Path" => builder.metadata_path = Some(value.to_string()),
        "CPU Scheduling Code" => {
            builder.cpu_sched_code = Some(CpuSchedCode::parse(value).ok_or_else(|| out_of_range(prompt))?);
        }
        "Quantum Time (cycles)" => {
            let v: u32 = value.parse().map_err(|_| out_of_range(prompt))?;
            if v > 100 {
                return Err(out_of_range(prompt));
            }
            builder.quantum_cycles = Some(v);
        }
        "Memory Display (On/Off)" => {
            builder.mem_display = Some(match value.to_ascii_lowercase().as_str() {
                "on" => true,
                "off" => false,
                _ => return Err(out_of_range(prompt)),
            });
        }
        "Memory Available (KB)" => {
            let v: u32 = value.parse().map_err(|_| out_of_range(prompt))?;
            if !(1024..=102_400).contains(&v) {
                return Err(out_of_range(prompt));
            }
            builder.mem_available = Some(v);
        }
        "Processor Cycle Time (msec)" => {
            let v: u32 = value.parse().map_err(|_| out_of_range(prompt))?;
            if !(1..=100).contains(&v) {
                return Err(out_of_range(prompt));
            }
            builder.proc_cycle_time = Some(v);
        }
        "I/O Cycle Time (msec)" => {
            let v: u32 = value.parse().map_err(|_| out_of_range(prompt))?;
            if !(1..=1000).contains(&v) {
                return Err(out_of_range(prompt));
            }
            builder.io_cycle_time = Some(v);
        }
        "Log To" => {
            builder.log_to = Some(LogTo::parse(value).ok_or_else(|| out_of_range(prompt))?);
        }
        "Log File Path" => builder.log_file_path = Some(value.to_string()),
        _ => {
            return Err(ConfigError::UnknownPrompt {
                prompt: prompt.to_string(),
            })
        }
    }
    Ok(())
}

impl fmt::Display for ConfigData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Version/Phase : {:.2}", self.version_phase)?;
        writeln!(f, "File Path : {}", self.metadata_path)?;
        writeln!(f, "CPU Scheduling Code : {}", self.cpu_sched_code)?;
        writeln!(f, "Quantum Time (cycles) : {}", self.quantum_cycles)?;
        writeln!(f, "Memory Display (On/Off) : {}", if self.mem_display { "On" } else { "Off" })?;
        writeln!(f, "Memory Available (KB) : {}", self.mem_available)?;
        writeln!(f, "Processor Cycle Time (msec) : {}", self.proc_cycle_time)?;
        writeln!(f, "I/O Cycle Time (msec) : {}", self.io_cycle_time)?;
        writeln!(f, "Log To : {}", self.log_to)?;
        write!(f, "Log File Path : {}", self.log_file_path)
    }
}
