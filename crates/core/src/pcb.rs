//! Process control block store and circular scheduling list.
//!
//! The circular doubly-linked PCB list is modeled as a `Vec<Pcb>` plus
//! `head`/`current` indices and `prev`/`next` indices on each `Pcb` —
//! `cycle_from` is the one traversal primitive every selection policy and
//! every blocked/interrupt-handling path shares.

use crate::config::CpuSchedCode;
use crate::metadata::{Command, InOut, OpCode};
use crate::output::OutputSink;
use crate::timer::SimClock;
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcbState {
    /// Created, not yet admitted to the ready list.
    New,
    /// Eligible to run, waiting for selection.
    Ready,
    /// Currently selected and executing.
    Running,
    /// Waiting on a dispatched interrupt.
    Blocked,
    /// Finished; never transitions again.
    Exit,
}

impl fmt::Display for PcbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Blocked => "BLOCKED",
            Self::Exit => "EXIT",
        };
        f.write_str(s)
    }
}

/// One process's scheduler state.
#[derive(Debug, Clone)]
pub struct Pcb {
    /// Dense, zero-based, assigned in first-encountered order.
    pub pid: u32,
    program: Arc<[OpCode]>,
    /// Index of the first opcode after this process's `app start`.
    head: usize,
    /// Index of this process's `app end` opcode (exclusive bound on `pc`).
    end: usize,
    /// Index of the opcode currently executing, in `[head, end]`.
    pub pc: usize,
    /// Cycles run of the opcode at `pc`.
    pub completed_program_cycles: u32,
    /// Cycles run since this PCB was last scheduled (RR-P quantum tracking).
    pub consecutive_cycles: u32,
    /// Estimated milliseconds of work remaining across the whole program.
    pub remaining_total_time: u64,
    /// Current lifecycle state.
    pub state: PcbState,
    prev: usize,
    next: usize,
}

impl Pcb {
    /// The opcode at the current program counter, or `None` once the PCB has
    /// reached `app end`.
    #[must_use]
    pub fn current_op(&self) -> Option<&OpCode> {
        (self.pc < self.end).then(|| &self.program[self.pc])
    }

    /// Whether the program counter has reached `app end`.
    #[must_use]
    pub fn at_program_end(&self) -> bool {
        self.pc >= self.end
    }

    /// Steps the program counter forward and resets per-opcode cycle
    /// counters. Returns `true` if this step reached `app end`.
    pub fn step(&mut self) -> bool {
        self.pc += 1;
        self.completed_program_cycles = 0;
        self.consecutive_cycles = 0;
        self.at_program_end()
    }
}

/// The PCB list plus the circular links and selection state.
#[derive(Debug)]
pub struct PcbStore {
    pcbs: Vec<Pcb>,
    head: usize,
    /// Index of the currently selected PCB.
    pub current: usize,
}

impl PcbStore {
    /// Builds one PCB per `app start ... app end` region in `program`,
    /// linking them into a circular list in first-encountered (insertion)
    /// order.
    #[must_use]
    pub fn build(program: &Arc<[OpCode]>, proc_cycle_time: u32, io_cycle_time: u32) -> Self {
        let mut pcbs = Vec::new();
        let mut pid = 0u32;
        let mut i = 0usize;
        while i < program.len() {
            if program[i].command == Command::App && program[i].str_arg1 == "start" {
                let head = i + 1;
                let mut j = head;
                while !(program[j].command == Command::App && program[j].str_arg1 == "end") {
                    j += 1;
                }
                let end = j;
                let remaining_total_time = program[head..end]
                    .iter()
                    .map(|op| u64::from(op.int_arg2) * u64::from(op.cycle_rate(proc_cycle_time, io_cycle_time)))
                    .sum();
                pcbs.push(Pcb {
                    pid,
                    program: Arc::clone(program),
                    head,
                    end,
                    pc: head,
                    completed_program_cycles: 0,
                    consecutive_cycles: 0,
                    remaining_total_time,
                    state: PcbState::New,
                    prev: 0,
                    next: 0,
                });
                pid += 1;
                i = end + 1;
            } else {
                i += 1;
            }
        }

        let len = pcbs.len();
        for (idx, pcb) in pcbs.iter_mut().enumerate() {
            pcb.prev = (idx + len - 1) % len;
            pcb.next = (idx + 1) % len;
        }

        Self {
            pcbs,
            head: 0,
            current: 0,
        }
    }

    /// Number of PCBs in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    /// Whether the store holds no PCBs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    /// Read-only access to a PCB by index.
    #[must_use]
    pub fn get(&self, index: usize) -> &Pcb {
        &self.pcbs[index]
    }

    /// Mutable access to a PCB by index.
    pub fn get_mut(&mut self, index: usize) -> &mut Pcb {
        &mut self.pcbs[index]
    }

    /// Index of the list head.
    #[must_use]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Yields every index reachable in one full loop starting at (and
    /// including) `start`, following `next`. The shared traversal primitive
    /// behind every selection policy.
    #[must_use]
    pub fn cycle_from(&self, start: usize) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.pcbs.len());
        let mut idx = start;
        loop {
            order.push(idx);
            idx = self.pcbs[idx].next;
            if idx == start {
                break;
            }
        }
        order
    }

    /// Whether every PCB has reached EXIT.
    #[must_use]
    pub fn all_exited(&self) -> bool {
        self.pcbs.iter().all(|p| p.state == PcbState::Exit)
    }

    fn eligible(&self, index: usize) -> bool {
        matches!(self.pcbs[index].state, PcbState::Ready | PcbState::Running)
    }

    /// Picks the next PCB to run under `policy`. Returns `None` when no PCB
    /// is READY or RUNNING.
    #[must_use]
    pub fn select_next(&self, policy: CpuSchedCode) -> Option<usize> {
        match policy {
            CpuSchedCode::FcfsN | CpuSchedCode::FcfsP => {
                self.cycle_from(self.head).into_iter().find(|&i| self.eligible(i))
            }
            CpuSchedCode::SjfN | CpuSchedCode::SrtfP => self
                .cycle_from(self.head)
                .into_iter()
                .filter(|&i| self.eligible(i))
                .min_by_key(|&i| self.pcbs[i].remaining_total_time),
            CpuSchedCode::RrP => {
                let anchor = self.pcbs[self.current].next;
                if anchor == self.current {
                    return self.eligible(self.current).then_some(self.current);
                }
                self.cycle_from(anchor)
                    .into_iter()
                    .filter(|&i| i != self.current)
                    .find(|&i| self.eligible(i))
            }
        }
    }

    /// Transitions `index` to `new_state`, logging
    /// `"OS: Process <pid> set from <old> to <new>"` iff the state actually
    /// changes.
    pub fn set_state(&mut self, index: usize, new_state: PcbState, sink: &mut OutputSink, clock: &SimClock) {
        let pcb = &mut self.pcbs[index];
        if pcb.state == new_state {
            return;
        }
        let old = pcb.state;
        pcb.state = new_state;
        sink.log(
            clock,
            &format!("OS: Process {} set from {old} to {new_state}", pcb.pid),
        );
    }

    /// Formats the start/end message for the opcode at `index`'s current
    /// program counter. Returns `None` for a command with no described form,
    /// or once the PCB has no current opcode.
    #[must_use]
    pub fn task_description(&self, index: usize, starting: bool) -> Option<String> {
        let pcb = &self.pcbs[index];
        let op = pcb.current_op()?;
        let phase = if starting { "start" } else { "end" };
        match op.command {
            Command::Dev => {
                let io = match op.in_out_arg {
                    InOut::In => "input",
                    InOut::Out => "output",
                    InOut::None => return None,
                };
                Some(format!(
                    "Process: {}, {} {io} operation {phase}",
                    pcb.pid, op.str_arg1
                ))
            }
            Command::Cpu => Some(format!(
                "Process: {}, cpu {} operation {phase}",
                pcb.pid, op.str_arg1
            )),
            Command::Mem => Some(format!(
                "Process: {}, mem {} request ({},{}) {phase}",
                pcb.pid, op.str_arg1, op.int_arg2, op.int_arg3
            )),
            Command::Sys | Command::App => None,
        }
    }
}
