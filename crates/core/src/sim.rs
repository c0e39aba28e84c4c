//! Scheduler and driver loop.
//!
//! The `while` loop below is a sequential if-block structure, not a
//! five-way mutually exclusive branch: each iteration does (interrupt
//! drain OR opcode execution) then unconditionally
//! (advance-if-flagged, reselect-if-flagged, idle check).

use crate::config::{ConfigData, CpuSchedCode};
use crate::interrupt::InterruptManager;
use crate::mem::Memory;
use crate::metadata::{Command, OpCode};
use crate::output::OutputSink;
use crate::pcb::{PcbState, PcbStore};
use crate::timer::{sleep_ms, SimClock};
use std::path::Path;
use std::sync::Arc;

/// Runs a full simulation to completion: builds the PCB list and memory
/// space from `config` and `opcodes`, drives the scheduler loop, and flushes
/// the log to `config.log_file_path` if file logging was requested.
pub fn run(config: ConfigData, opcodes: Vec<OpCode>) {
    Simulator::new(config, opcodes).run();
}

/// Owns every piece of simulator state: the PCB list, memory, the interrupt
/// manager, the output sink, and the clock.
#[derive(Debug)]
pub struct Simulator {
    config: ConfigData,
    pcbs: PcbStore,
    memory: Memory,
    interrupts: InterruptManager,
    output: OutputSink,
    clock: SimClock,
    idling: bool,
}

impl Simulator {
    /// Builds the PCB list and memory space from `config` and `opcodes`.
    #[must_use]
    pub fn new(config: ConfigData, opcodes: Vec<OpCode>) -> Self {
        let opcodes: Arc<[OpCode]> = Arc::from(opcodes);
        let pcbs = PcbStore::build(&opcodes, config.proc_cycle_time, config.io_cycle_time);
        let memory = Memory::create(config.mem_available);
        let mut output = OutputSink::new();
        output.configure(config.log_to);
        Self {
            config,
            pcbs,
            memory,
            interrupts: InterruptManager::new(),
            output,
            clock: SimClock::new(),
            idling: false,
        }
    }

    /// Runs the driver loop to completion.
    pub fn run(mut self) {
        self.clock.zero();
        self.output.log(&self.clock, "OS: Simulator start");

        for index in 0..self.pcbs.len() {
            self.pcbs.set_state(index, PcbState::Ready, &mut self.output, &self.clock);
        }

        let head = self.pcbs.head();
        self.select_current(head);

        while !(self.pcbs.all_exited() && !self.interrupts.outstanding() && self.interrupts.is_empty()) {
            let (select_next_program, mut select_next_process) = if let Some(pid) = self.interrupts.poll() {
                self.handle_interrupt_drain(pid)
            } else if self.idling {
                sleep_ms(1);
                (false, false)
            } else {
                self.execute_current()
            };

            if select_next_program {
                let current = self.pcbs.current;
                if self.advance(current, true) {
                    select_next_process = true;
                }
            }

            if select_next_process {
                self.reselect();
            }

            self.idle_check();
        }

        self.memory
            .display(&mut self.output, &self.clock, "After clear all process success");
        self.output.log(&self.clock, "OS: Simulation End");
        let _ = self.output.flush_to_file(Path::new(&self.config.log_file_path));
    }

    /// Drains one completed interrupt.
    fn handle_interrupt_drain(&mut self, completed_pid: u32) -> (bool, bool) {
        let completed = completed_pid as usize;
        if self.idling {
            self.output.log(&self.clock, "OS: CPU interrupt, end idle");
            self.idling = false;
            self.output.blank();
            self.output
                .log(&self.clock, &format!("OS: Interrupted by process {completed_pid}"));
            self.pcbs.set_state(completed, PcbState::Ready, &mut self.output, &self.clock);
            self.pcbs.set_state(completed, PcbState::Running, &mut self.output, &self.clock);
            self.pcbs.current = completed;
            (true, false)
        } else {
            self.output.log(&self.clock, "OS: Blocking current process for interrupt");
            let current = self.pcbs.current;
            self.pcbs.set_state(current, PcbState::Blocked, &mut self.output, &self.clock);
            self.output.blank();
            self.output
                .log(&self.clock, &format!("OS: Interrupted by process {completed_pid}"));
            self.pcbs.set_state(completed, PcbState::Running, &mut self.output, &self.clock);
            let ended = self.advance(completed, true);
            if !ended {
                self.pcbs.set_state(completed, PcbState::Ready, &mut self.output, &self.clock);
            }
            self.output.blank();
            self.output.log(&self.clock, "OS: Done interrupting, continue with current");
            self.pcbs.set_state(current, PcbState::Running, &mut self.output, &self.clock);
            (false, false)
        }
    }

    /// Executes one opcode of the current PCB.
    /// Returns `(select_next_program, select_next_process)`.
    fn execute_current(&mut self) -> (bool, bool) {
        let index = self.pcbs.current;
        let Some(op) = self.pcbs.get(index).current_op().cloned() else {
            return (false, true);
        };

        match op.command {
            Command::Mem => {
                self.execute_mem_op(index, &op);
                let ended = self.advance(index, false);
                (false, ended)
            }
            Command::Dev if self.config.cpu_sched_code.is_preemptive() => {
                self.execute_preemptive_dev(index, &op);
                (false, true)
            }
            Command::Cpu | Command::Dev | Command::Sys | Command::App => {
                self.execute_cpu_or_blocking_dev(index, &op)
            }
        }
    }

    fn execute_mem_op(&mut self, index: usize, op: &OpCode) {
        let pid = i64::from(self.pcbs.get(index).pid);
        match op.str_arg1.as_str() {
            "allocate" => {
                let ok = self.memory.allocate_first_fit(pid, op.int_arg2, op.int_arg3);
                let label = if ok { "After allocate success" } else { "After allocate failure" };
                self.memory.display(&mut self.output, &self.clock, label);
                if !ok {
                    self.output.raw("not enough memory");
                }
            }
            "access" => {
                let ok = self.memory.access(pid, op.int_arg2, op.int_arg3);
                let label = if ok { "After access success" } else { "After access failure" };
                self.memory.display(&mut self.output, &self.clock, label);
            }
            _ => {}
        }
    }

    fn execute_preemptive_dev(&mut self, index: usize, op: &OpCode) {
        let duration = u64::from(self.config.io_cycle_time) * u64::from(op.int_arg2);
        let pcb = self.pcbs.get_mut(index);
        pcb.remaining_total_time = pcb.remaining_total_time.saturating_sub(duration);
        let pid = pcb.pid;
        self.pcbs.set_state(index, PcbState::Blocked, &mut self.output, &self.clock);
        self.interrupts.dispatch(pid, duration);
    }

    /// CPU op, or non-preemptive device op: cycles in place until the opcode
    /// completes, an interrupt arrives, or (RR-P only) the quantum expires.
    fn execute_cpu_or_blocking_dev(&mut self, index: usize, op: &OpCode) -> (bool, bool) {
        if self.pcbs.get(index).completed_program_cycles == 0 {
            if let Some(desc) = self.pcbs.task_description(index, true) {
                self.output.log(&self.clock, &desc);
            }
        }
        self.pcbs.get_mut(index).consecutive_cycles = 0;

        loop {
            self.run_cycle(index, op);
            let pcb = self.pcbs.get(index);
            if pcb.completed_program_cycles >= op.int_arg2 {
                return (true, false);
            }
            if !self.interrupts.is_empty() {
                return (false, false);
            }
            if self.config.cpu_sched_code == CpuSchedCode::RrP && pcb.consecutive_cycles >= self.config.quantum_cycles
            {
                self.output
                    .log(&self.clock, &format!("OS: Process {} quantum time out", pcb.pid));
                return (false, true);
            }
        }
    }

    fn run_cycle(&mut self, index: usize, op: &OpCode) {
        let rate = op.cycle_rate(self.config.proc_cycle_time, self.config.io_cycle_time);
        sleep_ms(u64::from(rate));
        let pcb = self.pcbs.get_mut(index);
        pcb.remaining_total_time = pcb.remaining_total_time.saturating_sub(u64::from(rate));
        pcb.completed_program_cycles += 1;
        pcb.consecutive_cycles += 1;
    }

    /// Advances `index`'s program counter, emitting the end-of-task
    /// description (if `emit_description`) and, if this step reached
    /// `app end`, the "Process N ended" line, the memory free, and the EXIT
    /// transition. Returns whether the PCB ended.
    fn advance(&mut self, index: usize, emit_description: bool) -> bool {
        if emit_description {
            if let Some(desc) = self.pcbs.task_description(index, false) {
                self.output.log(&self.clock, &desc);
            }
        }
        let ended = self.pcbs.get_mut(index).step();
        if ended {
            let pid = self.pcbs.get(index).pid;
            self.output.log(&self.clock, &format!("OS: Process {pid} ended"));
            self.memory.deallocate_process(i64::from(pid));
            self.pcbs.set_state(index, PcbState::Exit, &mut self.output, &self.clock);
        }
        ended
    }

    /// Picks the next PCB and, if it differs from `current`,
    /// demotes `current` to READY (if it is still RUNNING — it may already
    /// be BLOCKED or EXIT from the triggering branch) and transitions the
    /// selection to RUNNING.
    ///
    /// Does not itself emit a task-start description: `execute_cpu_or_blocking_dev`
    /// is the sole place that happens, guarded by `completed_program_cycles == 0`,
    /// so a process resumed mid-opcode after a quantum timeout is not re-announced
    /// as starting fresh.
    fn reselect(&mut self) {
        let Some(next) = self.pcbs.select_next(self.config.cpu_sched_code) else {
            return;
        };
        let current = self.pcbs.current;
        if next == current {
            return;
        }
        if self.pcbs.get(current).state == PcbState::Running {
            self.pcbs.set_state(current, PcbState::Ready, &mut self.output, &self.clock);
        }
        self.select_current(next);
    }

    fn select_current(&mut self, index: usize) {
        self.pcbs.current = index;
        self.pcbs.set_state(index, PcbState::Running, &mut self.output, &self.clock);
    }

    fn idle_check(&mut self) {
        if self.idling || self.pcbs.all_exited() {
            return;
        }
        if self.pcbs.select_next(self.config.cpu_sched_code).is_none() {
            self.output
                .log(&self.clock, "OS: CPU idle, all active processes blocked");
            self.idling = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogTo;

    fn config(sched: CpuSchedCode, quantum: u32) -> ConfigData {
        ConfigData {
            version_phase: 1.0,
            metadata_path: "test.mdf".to_string(),
            cpu_sched_code: sched,
            quantum_cycles: quantum,
            mem_display: false,
            mem_available: 16384,
            proc_cycle_time: 1,
            io_cycle_time: 1,
            log_to: LogTo::File,
            log_file_path: "test.lgf".to_string(),
        }
    }

    fn single_cpu_process() -> Vec<OpCode> {
        let text = "Start Program Meta-Data Code:\n\
             sys()start,0;\n\
             app()start,0;\n\
             cpu()process,3;\n\
             app()end,0;\n\
             sys()end,0;\n\
             End Program Meta-Data Code.";
        crate::metadata::parse(text).unwrap()
    }

    #[test]
    fn single_process_fcfs_n_runs_to_completion() {
        let sim = Simulator::new(config(CpuSchedCode::FcfsN, 0), single_cpu_process());
        sim.run();
    }

    #[test]
    fn idle_scenario_emits_idle_then_resumes() {
        let text = "Start Program Meta-Data Code:\n\
             sys()start,0;\n\
             app()start,0;\n\
             dev(in)keyboard,1;\n\
             app()end,0;\n\
             sys()end,0;\n\
             End Program Meta-Data Code.";
        let opcodes = crate::metadata::parse(text).unwrap();
        let sim = Simulator::new(config(CpuSchedCode::FcfsP, 0), opcodes);
        sim.run();
    }

    #[test]
    fn round_robin_with_two_processes_runs_to_completion() {
        let text = "Start Program Meta-Data Code:\n\
             sys()start,0;\n\
             app()start,0;\n\
             cpu()process,5;\n\
             app()end,0;\n\
             app()start,0;\n\
             cpu()process,5;\n\
             app()end,0;\n\
             sys()end,0;\n\
             End Program Meta-Data Code.";
        let opcodes = crate::metadata::parse(text).unwrap();
        let sim = Simulator::new(config(CpuSchedCode::RrP, 2), opcodes);
        sim.run();
    }
}
