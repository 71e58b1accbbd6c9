use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::log::{LogSink, TracingLogSink};
use crate::opts::Opts;
use crate::statement::{Statement, borrow_conn};
use crate::sync::Conn;

/// Shared handle to a [`Conn`] that hands out [`Statement`]s
///
/// Cloning is cheap; all clones and all statements share the same connection and log sink.
/// The handle is `!Send`: the connection serves one logical caller.
#[derive(Clone)]
pub struct Connection {
    conn: Rc<RefCell<Conn>>,
    log: Rc<dyn LogSink>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect and authenticate
    pub fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        Ok(Self::from_conn(Conn::new(opts)?))
    }

    pub fn from_conn(conn: Conn) -> Self {
        Self {
            conn: Rc::new(RefCell::new(conn)),
            log: Rc::new(TracingLogSink),
        }
    }

    /// Replace the sink that statements and result sets report failures to
    pub fn with_log_sink(mut self, log: impl LogSink + 'static) -> Self {
        self.log = Rc::new(log);
        self
    }

    pub fn log_sink(&self) -> &dyn LogSink {
        &*self.log
    }

    /// Prepare `sql` on the server
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        let info = borrow_conn(&self.conn)?.prepare(sql)?;
        Ok(Statement::new(
            Rc::clone(&self.conn),
            Rc::clone(&self.log),
            info,
        ))
    }

    pub fn ping(&self) -> Result<()> {
        borrow_conn(&self.conn)?.ping()
    }

    pub fn server_version(&self) -> Result<String> {
        Ok(borrow_conn(&self.conn)?.server_version().to_string())
    }
}
