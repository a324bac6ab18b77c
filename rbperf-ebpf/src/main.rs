#![no_std]
#![no_main]

mod config;
mod decoder;
mod emitter;
mod interner;
mod maps;
mod remote;
mod walker;

use aya_ebpf::macros::perf_event;
use aya_ebpf::programs::PerfEventContext;
use aya_log_ebpf::{error, info};

/// Sampled-event entry point. Attached to either a CPU-clock perf event or a
/// raw syscall tracepoint by the (out-of-scope) userspace loader.
#[perf_event]
pub fn on_event(ctx: PerfEventContext) -> u32 {
    match walker::on_event(&ctx) {
        Ok(()) => 0,
        Err(e) if e.aborts_before_state() => {
            if config::verbose() {
                info!(&ctx, "sample dropped: {}", e.as_str());
            }
            0
        }
        Err(e) => {
            if config::verbose() {
                error!(&ctx, "on_event failed: {}", e.as_str());
            }
            0
        }
    }
}

/// Tail-called continuation, loaded into
/// `programs[RBPERF_STACK_READING_PROGRAM_IDX]`.
#[perf_event]
pub fn walk_ruby_stack(ctx: PerfEventContext) -> u32 {
    match walker::walk_ruby_stack(&ctx) {
        Ok(()) => 0,
        Err(e) => {
            if config::verbose() {
                error!(&ctx, "walk_ruby_stack failed: {}", e.as_str());
            }
            0
        }
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
