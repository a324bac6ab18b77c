use thiserror::Error;

/// Userspace-side error type. Wraps the shared kernel/common error plus the
/// failure modes that only exist on this side of the boundary (loading,
/// attaching, I/O).
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to load eBPF object: {0}")]
    Load(#[source] aya::EbpfError),

    #[error("failed to initialize eBPF log forwarder: {0}")]
    Log(#[source] aya_log::Error),

    #[error("failed to attach program {program}: {source}")]
    Attach {
        program: &'static str,
        #[source]
        source: aya::programs::ProgramError,
    },

    #[error("map {0} not found in compiled object")]
    MapMissing(&'static str),

    #[error(transparent)]
    Map(#[from] aya::maps::MapError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("in-kernel profiler error: {0}")]
    Kernel(#[from] rbperf_common::RbperfError),
}
