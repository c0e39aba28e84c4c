//! Metadata (opcode) file data model and parser.
//!
//! Grammar: `cmd(io)arg1,int2[,int3]`. The parser yields a flat, file-order
//! `Vec<OpCode>` — a finite, non-restartable sequence — consumed exactly
//! once by [`crate::pcb::PcbStore::build`].

use crate::error::MetadataError;
use tracing::debug;

/// The five opcode command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Command {
    /// Simulation-wide `start`/`end` bracket.
    Sys,
    /// Per-process `start`/`end` bracket; one PCB per region.
    App,
    /// CPU-bound work.
    Cpu,
    /// Device I/O.
    Dev,
    /// Memory allocate/access.
    Mem,
}

impl Command {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "sys" => Some(Self::Sys),
            "app" => Some(Self::App),
            "cpu" => Some(Self::Cpu),
            "dev" => Some(Self::Dev),
            "mem" => Some(Self::Mem),
            _ => None,
        }
    }
}

/// Direction of a `dev` opcode; meaningless for every other command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InOut {
    /// Device input.
    In,
    /// Device output.
    Out,
    /// Not applicable (every command other than `dev`).
    None,
}

const VALID_ARG1: &[&str] = &[
    "access", "allocate", "end", "ethernet", "hard drive", "keyboard", "monitor", "printer",
    "process", "serial", "sound signal", "start", "usb", "video signal",
];

/// One parsed instruction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpCode {
    /// `sys`, `app`, `cpu`, `dev`, or `mem`.
    pub command: Command,
    /// Subcommand: `start`, `end`, `access`, `allocate`, or a device name.
    pub str_arg1: String,
    /// Direction of the I/O, meaningful only when `command == Dev`.
    pub in_out_arg: InOut,
    /// Cycle count, or logical base for `mem`.
    pub int_arg2: u32,
    /// Offset/size for `mem`; unused otherwise.
    pub int_arg3: u32,
}

impl OpCode {
    /// `proc_cycle_time` for `cpu`, `io_cycle_time` for `dev`, zero for
    /// everything else (including `mem`, which is instantaneous).
    #[must_use]
    pub fn cycle_rate(&self, proc_cycle_time: u32, io_cycle_time: u32) -> u32 {
        match self.command {
            Command::Cpu => proc_cycle_time,
            Command::Dev => io_cycle_time,
            Command::Sys | Command::App | Command::Mem => 0,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sys => "sys",
            Self::App => "app",
            Self::Cpu => "cpu",
            Self::Dev => "dev",
            Self::Mem => "mem",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let io = match self.in_out_arg {
            InOut::In => "in",
            InOut::Out => "out",
            InOut::None => "",
        };
        write!(f, "{}({})", self.command, io)?;
        write!(f, "{},{}", self.str_arg1, self.int_arg2)?;
        if self.int_arg3 != 0 {
            write!(f, ",{}", self.int_arg3)?;
        }
        Ok(())
    }
}

const LEADER: &str = "Start Program Meta-Data Code:";
const TRAILER: &str = "End Program Meta-Data Code.";

/// Parses the full text of a metadata file into a flat, file-order opcode list.
///
/// # Errors
///
/// Returns [`MetadataError`] on a missing/malformed leader or trailer, a
/// syntactically malformed opcode, an out-of-vocabulary command or argument,
/// or an unbalanced `app start`/`app end` pairing.
pub fn parse(text: &str) -> Result<Vec<OpCode>, MetadataError> {
    let body = text.replace('\n', ";");
    let entries: Vec<&str> = body.split(';').map(str::trim).filter(|e| !e.is_empty()).collect();

    let (first, rest) = entries.split_first().ok_or(MetadataError::BadLeader)?;
    if *first != LEADER {
        return Err(MetadataError::BadLeader);
    }
    let (last, interior) = rest.split_last().ok_or(MetadataError::BadTrailer)?;
    if *last != TRAILER {
        return Err(MetadataError::BadTrailer);
    }

    let mut opcodes = Vec::with_capacity(interior.len());
    let mut app_depth = 0i32;
    for entry in interior {
        let op = parse_opcode(entry)?;
        match (op.command, op.str_arg1.as_str()) {
            (Command::App, "start") => app_depth += 1,
            (Command::App, "end") => {
                app_depth -= 1;
                if app_depth < 0 {
                    return Err(MetadataError::UnbalancedAppEnd);
                }
            }
            _ => {}
        }
        opcodes.push(op);
    }
    if app_depth != 0 {
        return Err(MetadataError::UnbalancedAppEnd);
    }

    match opcodes.first() {
        Some(op) if op.command == Command::Sys && op.str_arg1 == "start" && op.int_arg2 == 0 => {}
        _ => return Err(MetadataError::BadLeader),
    }
    match opcodes.last() {
        Some(op) if op.command == Command::Sys && op.str_arg1 == "end" && op.int_arg2 == 0 => {}
        _ => return Err(MetadataError::BadTrailer),
    }

    debug!(opcodes = opcodes.len(), "parsed metadata file");
    Ok(opcodes)
}

fn parse_opcode(entry: &str) -> Result<OpCode, MetadataError> {
    let malformed = || MetadataError::BadOpcodeForm {
        text: entry.to_string(),
    };

    let (cmd_text, rest) = entry.split_once('(').ok_or_else(malformed)?;
    let (io_text, rest) = rest.split_once(')').ok_or_else(malformed)?;
    let mut fields = rest.splitn(3, ',').map(str::trim);
    let str_arg1 = fields.next().ok_or_else(malformed)?.to_string();
    let int_arg2: u32 = fields
        .next()
        .ok_or_else(malformed)?
        .parse()
        .map_err(|_| malformed())?;
    let int_arg3: u32 = match fields.next() {
        Some(text) => text.parse().map_err(|_| malformed())?,
        None => 0,
    };

    let command = Command::parse(cmd_text.trim()).ok_or_else(|| MetadataError::BadArg {
        arg: cmd_text.trim().to_string(),
    })?;
    if !VALID_ARG1.contains(&str_arg1.as_str()) {
        return Err(MetadataError::BadArg { arg: str_arg1 });
    }

    let in_out_arg = if command == Command::Dev {
        match io_text.trim() {
            "in" => InOut::In,
            "out" => InOut::Out,
            other => return Err(MetadataError::BadArg { arg: other.to_string() }),
        }
    } else {
        InOut::None
    };

    Ok(OpCode {
        command,
        str_arg1,
        in_out_arg,
        int_arg2,
        int_arg3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> String {
        "Start Program Meta-Data Code:\n\
         sys()start,0;\n\
         app()start,0;\n\
         cpu()process,5;\n\
         dev(in)keyboard,2;\n\
         app()end,0;\n\
         sys()end,0;\n\
         End Program Meta-Data Code."
            .to_string()
    }

    #[test]
    fn parses_a_well_formed_program() {
        let opcodes = parse(&sample()).unwrap();
        assert_eq!(opcodes.len(), 6);
        assert_eq!(opcodes[2].command, Command::Cpu);
        assert_eq!(opcodes[2].int_arg2, 5);
        assert_eq!(opcodes[3].in_out_arg, InOut::In);
    }

    #[test]
    fn missing_leader_is_an_error() {
        let text = sample().replace("Start Program Meta-Data Code:\n", "");
        assert!(matches!(parse(&text), Err(MetadataError::BadLeader)));
    }

    #[test]
    fn first_opcode_must_be_sys_start_zero() {
        let text = sample().replace("sys()start,0;\n", "sys()start,1;\n");
        assert!(matches!(parse(&text), Err(MetadataError::BadLeader)));
    }

    #[test]
    fn unbalanced_app_end_is_an_error() {
        let text = sample().replace("app()end,0;\n", "");
        assert!(matches!(parse(&text), Err(MetadataError::UnbalancedAppEnd)));
    }

    #[test]
    fn malformed_opcode_syntax_is_an_error() {
        let text = sample().replace("cpu()process,5;\n", "cpu process 5;\n");
        assert!(matches!(parse(&text), Err(MetadataError::BadOpcodeForm { .. })));
    }

    #[test]
    fn unknown_arg1_is_an_error() {
        let text = sample().replace("keyboard", "flux-capacitor");
        assert!(matches!(parse(&text), Err(MetadataError::BadArg { .. })));
    }

    #[test]
    fn display_round_trips_the_opcode_grammar() {
        let opcodes = parse(&sample()).unwrap();
        assert_eq!(opcodes[3].to_string(), "dev(in)keyboard,2");
        assert_eq!(opcodes[2].to_string(), "cpu()process,5");
    }

    #[test]
    fn cycle_rate_uses_proc_for_cpu_and_io_for_dev() {
        let opcodes = parse(&sample()).unwrap();
        assert_eq!(opcodes[2].cycle_rate(10, 20), 10);
        assert_eq!(opcodes[3].cycle_rate(10, 20), 20);
        assert_eq!(opcodes[0].cycle_rate(10, 20), 0);
    }
}
