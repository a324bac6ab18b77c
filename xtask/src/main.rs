//! Build tooling for the `rbperf-ebpf` crate, following the standard aya
//! workspace convention: `rbperf-ebpf` is excluded from `default-members`
//! (it needs `bpfel-unknown-none` plus `build-std`, which would break a
//! plain `cargo build` on a host toolchain), so it's built through this
//! task instead of being a normal workspace member build.

use std::process::Command;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

#[derive(Parser)]
struct Opt {
    #[command(subcommand)]
    command: Command_,
}

#[derive(Subcommand)]
enum Command_ {
    /// Cross-compile `rbperf-ebpf` for the `bpfel-unknown-none` target.
    /// Always built in release mode: `rbperf`'s `include_bytes_aligned!`
    /// hardcodes the `target/bpfel-unknown-none/release/rbperf` path, so a
    /// debug eBPF object would compile but never be found.
    BuildEbpf,
    /// Build the eBPF object, then build and run the `rbperf` userspace
    /// loader (which needs root to load/attach).
    Run {
        #[arg(long)]
        release: bool,
        /// Arguments forwarded to `rbperf` after `--`.
        #[arg(last = true)]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    match opt.command {
        Command_::BuildEbpf => build_ebpf(),
        Command_::Run { release, args } => {
            build_ebpf()?;
            run(release, &args)
        }
    }
}

fn build_ebpf() -> anyhow::Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args([
        "build", "-p", "rbperf-ebpf", "--target", "bpfel-unknown-none", "-Z", "build-std=core", "--release",
    ]);
    run_checked(cmd, "cargo build (rbperf-ebpf)")
}

fn run(release: bool, args: &[String]) -> anyhow::Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["build", "-p", "rbperf"]);
    if release {
        cmd.arg("--release");
    }
    run_checked(cmd, "cargo build (rbperf)")?;

    let profile = if release { "release" } else { "debug" };
    let binary = format!("target/{profile}/rbperf");
    let mut cmd = Command::new("sudo");
    cmd.arg("-E").arg(&binary).args(args);
    run_checked(cmd, "rbperf")
}

fn run_checked(mut cmd: Command, label: &str) -> anyhow::Result<()> {
    let status = cmd.status().with_context(|| format!("failed to spawn {label}"))?;
    if !status.success() {
        bail!("{label} exited with {status}");
    }
    Ok(())
}
