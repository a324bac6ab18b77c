use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "rbperf",
    version,
    about = r#"
rbperf loads an in-kernel sampling profiler for Ruby-like interpreters.
See "rbperf record --help" for additional information about the "rbperf record" command.

EXAMPLES:
    # Sample a running process by pid, using CPU-clock sampling:
    rbperf record -p 12345

    # Sample syscalls instead of wall-clock time:
    rbperf record -p 12345 --event syscall

    # Print the frame table of a previously recorded run:
    rbperf show-frames stacks.bin
"#
)]
pub struct Opt {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Attach to a process and stream resolved stacks to stdout.
    Record(RecordArgs),

    /// Print the frame/stack contents of a captured dump.
    ShowFrames(ShowFramesArgs),
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Pid of the process to sample.
    #[arg(short, long)]
    pub pid: i32,

    /// Sampling mode: the kernel-side entry point this attaches to.
    #[arg(long, value_enum, default_value = "cpu-clock")]
    pub event: EventArg,

    /// Sampling frequency in Hz, for `--event cpu-clock`.
    #[arg(long, default_value_t = 99)]
    pub frequency: u64,

    /// Use a BPF ring buffer instead of a per-CPU perf event array.
    #[arg(long, default_value_t = true)]
    pub ringbuf: bool,

    /// Disable the pid-reuse guard (the process re-registration race check).
    #[arg(long)]
    pub no_pid_race_detector: bool,

    /// Print every skipped/errored sample, not just a summary.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum EventArg {
    CpuClock,
    Syscall,
    Uprobe,
}

#[derive(Debug, Args)]
pub struct ShowFramesArgs {
    /// Path to a file of length-prefixed `StackRecord`s written by `record`.
    pub file: PathBuf,
}
