use nix::errno::Errno;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Unknown register '{0}'")]
    UnknownRegister(String),

    #[error("Invalid breakpoint index {index} ({count} breakpoints set)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Invalid number '{0}'")]
    Parse(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{op} failed: {source}")]
    TraceOpFailed {
        op: &'static str,
        #[source]
        source: Errno,
    },

    #[error("the target process is no longer running")]
    TargetExited,

    #[error("I/O error")]
    IO(#[from] std::io::Error),

    #[error("line editor error")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Builds a `map_err` adapter tagging a failed process-control primitive.
pub fn trace_op(op: &'static str) -> impl FnOnce(Errno) -> Error {
    move |source| Error::TraceOpFailed { op, source }
}
