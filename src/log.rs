use auto_impl::auto_impl;

/// Destination for errors that the cursor-style API reports by logging instead of returning
///
/// A `ResultSet` never surfaces errors through its getters. Failures while storing or
/// decoding rows are written here, and the cursor degrades to an invalid or exhausted state.
#[auto_impl(&, Box, Rc, Arc)]
pub trait LogSink {
    fn log(&self, message: &str);
}

/// Forwards messages to `tracing::error!`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, message: &str) {
        tracing::error!(target: "zero_mysql_bind", "{}", message);
    }
}

/// Adapts a closure into a [`LogSink`]
pub struct FnLogSink<F>(pub F);

impl<F: Fn(&str)> LogSink for FnLogSink<F> {
    fn log(&self, message: &str) {
        (self.0)(message)
    }
}
