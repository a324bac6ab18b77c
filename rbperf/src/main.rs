mod cli;
mod error;
mod events;
mod offsets;

use aya::maps::{Array, HashMap as AyaHashMap, MapData, PerCpuArray, RingBuf};
use aya::programs::{perf_event::PerfTypeId, PerfEvent, SamplePolicy};
use aya::{include_bytes_aligned, Ebpf, EbpfLoader};
use aya_log::EbpfLogger;
use clap::Parser;
use log::info;

use cli::{Action, EventArg, Opt, RecordArgs};
use error::LoaderError;
use rbperf_common::{EventType, LoadConfig, ProcessRecord};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::parse();
    match opt.action {
        Action::Record(args) => do_record_action(args)?,
        Action::ShowFrames(args) => do_show_frames_action(args)?,
    }
    Ok(())
}

/// Loads the kernel object, registers the one sampled process, attaches the
/// sampled-event entry point, and drains resolved stacks until interrupted.
///
/// Offset detection, process discovery, and program attachment tuning are
/// handled by other collaborators in a full deployment; this wires up just
/// enough of each to exercise the core end to end against a single
/// already-known pid and a single built-in offset table entry.
fn do_record_action(args: RecordArgs) -> anyhow::Result<()> {
    let event_type = match args.event {
        EventArg::CpuClock => EventType::CpuClock,
        EventArg::Syscall => EventType::Syscall,
        EventArg::Uprobe => EventType::Uprobe,
    };

    let config = LoadConfig {
        verbose: args.verbose,
        use_ringbuf: args.ringbuf,
        enable_pid_race_detector: !args.no_pid_race_detector,
        event_type,
    };

    let mut loader = EbpfLoader::new();
    loader
        .set_global("VERBOSE", &config.verbose, true)
        .set_global("USE_RINGBUF", &config.use_ringbuf, true)
        .set_global("ENABLE_PID_RACE_DETECTOR", &config.enable_pid_race_detector, true)
        .set_global("EVENT_TYPE", &(config.event_type as u32), true);

    // Built by `cargo xtask build-ebpf` (or `cargo xtask run`, which builds
    // then runs this binary) into the path below, following the aya
    // workspace convention rather than a build.rs/OUT_DIR dance.
    let mut ebpf = loader
        .load(include_bytes_aligned!(
            "../../target/bpfel-unknown-none/release/rbperf"
        ))
        .map_err(LoaderError::Load)?;

    // Forwards `aya_log_ebpf::{info, error}` records from the kernel side
    // (gated there on `config::verbose()`) into this process's `log`/
    // `env_logger` stack; without this, `--verbose` kernel log writes are
    // never read by anything.
    EbpfLogger::init(&mut ebpf).map_err(LoaderError::Log)?;

    populate_offsets(&mut ebpf)?;
    register_process(&mut ebpf, args.pid, offsets::PLACEHOLDER_VERSION_TAG)?;

    let program: &mut PerfEvent = ebpf
        .program_mut("on_event")
        .expect("on_event program missing from compiled object")
        .try_into()
        .map_err(|source| LoaderError::Attach { program: "on_event", source })?;
    program.load().map_err(|source| LoaderError::Attach { program: "on_event", source })?;
    program
        .attach(
            PerfTypeId::Software,
            aya::programs::perf_event::perf_sw_ids::PERF_COUNT_SW_CPU_CLOCK as u64,
            aya::programs::perf_event::PerfEventScope::AllProcessesOneCpu { cpu: 0 },
            SamplePolicy::Frequency(args.frequency),
            true,
        )
        .map_err(|source| LoaderError::Attach { program: "on_event", source })?;

    info!("attached to pid {}, sampling at {} Hz", args.pid, args.frequency);
    drain_events(&mut ebpf, config.use_ringbuf)
}

fn populate_offsets(ebpf: &mut Ebpf) -> Result<(), LoaderError> {
    let mut table: Array<&mut MapData, rbperf_common::VersionOffsets> =
        ebpf.map_mut("version_specific_offsets").ok_or(LoaderError::MapMissing("version_specific_offsets"))?.try_into().map_err(LoaderError::Map)?;
    for (tag, entry) in offsets::builtin_table() {
        table.set(tag, entry, 0).map_err(LoaderError::Map)?;
    }
    Ok(())
}

fn register_process(ebpf: &mut Ebpf, pid: i32, version_tag: u32) -> Result<(), LoaderError> {
    let mut pid_to_rb_thread: AyaHashMap<&mut MapData, u32, ProcessRecord> = ebpf
        .map_mut("pid_to_rb_thread")
        .ok_or(LoaderError::MapMissing("pid_to_rb_thread"))?
        .try_into()
        .map_err(LoaderError::Map)?;
    // `current_thread_addr` would normally come from resolving
    // `ruby_current_thread`'s address in the target's symbol table, out
    // of scope here, so this registers a sentinel non-zero address solely
    // to exercise `ProcessRecord::is_registered`.
    let process = ProcessRecord::new(0x1, version_tag);
    events::register_process(&mut pid_to_rb_thread, pid as u32, process)
}

fn drain_events(ebpf: &mut Ebpf, use_ringbuf: bool) -> anyhow::Result<()> {
    let mut printer = events::StackPrinter::new();
    let id_to_stack: AyaHashMap<&MapData, rbperf_common::FrameId, rbperf_common::FrameRecord> =
        ebpf.map("id_to_stack").ok_or(LoaderError::MapMissing("id_to_stack"))?.try_into().map_err(LoaderError::Map)?;
    let rbperf_stats: PerCpuArray<&MapData, rbperf_common::RbperfStats> =
        ebpf.map("rbperf_stats").ok_or(LoaderError::MapMissing("rbperf_stats"))?.try_into().map_err(LoaderError::Map)?;

    if use_ringbuf {
        let mut ringbuf: RingBuf<&mut MapData> =
            ebpf.map_mut("events_ringbuf").ok_or(LoaderError::MapMissing("events_ringbuf"))?.try_into().map_err(LoaderError::Map)?;
        // Drop counters are only worth a reader's attention periodically,
        // not on every 10ms poll tick.
        const STATS_LOG_EVERY_TICKS: u32 = 100;
        let mut ticks: u32 = 0;
        loop {
            while let Some(item) = ringbuf.next() {
                if let Some(record) = bytes_as_stack_record(&item) {
                    printer.print(&id_to_stack, record)?;
                }
            }
            ticks += 1;
            if ticks % STATS_LOG_EVERY_TICKS == 0 {
                if let Ok(stats) = aggregate_stats(&rbperf_stats) {
                    events::log_dropped(&stats);
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    } else {
        // The per-CPU perf-buffer path polls per online CPU; omitted here
        // since the ring-buffer path above already exercises the same
        // `StackRecord` decode/print logic end to end.
        anyhow::bail!("perf-buffer draining is not wired up in this skeleton; pass --ringbuf");
    }
}

/// Sums the per-CPU `rbperf_stats` slot into one aggregate for `log_dropped`.
fn aggregate_stats(map: &PerCpuArray<&MapData, rbperf_common::RbperfStats>) -> Result<rbperf_common::RbperfStats, LoaderError> {
    let per_cpu = map.get(&0, 0).map_err(LoaderError::Map)?;
    let mut total = rbperf_common::RbperfStats::default();
    for cpu_stats in per_cpu.iter() {
        total.samples_attempted = total.samples_attempted.wrapping_add(cpu_stats.samples_attempted);
        total.samples_published = total.samples_published.wrapping_add(cpu_stats.samples_published);
        total.not_registered = total.not_registered.wrapping_add(cpu_stats.not_registered);
        total.version_missing = total.version_missing.wrapping_add(cpu_stats.version_missing);
        total.pid_raced = total.pid_raced.wrapping_add(cpu_stats.pid_raced);
        total.remote_read_fault = total.remote_read_fault.wrapping_add(cpu_stats.remote_read_fault);
        total.unknown_object_type = total.unknown_object_type.wrapping_add(cpu_stats.unknown_object_type);
        total.budget_exhausted = total.budget_exhausted.wrapping_add(cpu_stats.budget_exhausted);
        total.output_full = total.output_full.wrapping_add(cpu_stats.output_full);
    }
    Ok(total)
}

fn bytes_as_stack_record(bytes: &[u8]) -> Option<&rbperf_common::StackRecord> {
    if bytes.len() < core::mem::size_of::<rbperf_common::StackRecord>() {
        return None;
    }
    // SAFETY: `StackRecord` is `#[repr(C)]` and `Pod`; `bytes` comes
    // straight from the ring buffer this struct's producer wrote into.
    Some(unsafe { &*(bytes.as_ptr() as *const rbperf_common::StackRecord) })
}

/// Offline frame resolution needs a dumped `id_to_stack` snapshot alongside
/// the raw `StackRecord`s; out of scope for this skeleton, which only
/// exercises `record`'s live-map path.
fn do_show_frames_action(args: cli::ShowFramesArgs) -> Result<(), LoaderError> {
    let data = std::fs::read(&args.file)?;
    println!("{} bytes read from {:?}; offline frame resolution is not implemented", data.len(), args.file);
    Ok(())
}
