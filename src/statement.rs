use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use crate::datetime::{DateTime, Time};
use crate::error::{Error, Result};
use crate::handler::{DropHandler, ExecuteOutcome, StoreHandler, StoredResult};
use crate::log::LogSink;
use crate::protocol::r#trait::param::Param;
use crate::result_set::{ResultSet, ResultSetSource};
use crate::sync::{Conn, PreparedInfo};

pub(crate) fn borrow_conn(conn: &RefCell<Conn>) -> Result<RefMut<'_, Conn>> {
    conn.try_borrow_mut()
        .map_err(|_| Error::BadUsageError("connection is busy".to_string()))
}

/// A server-side prepared statement with its parameter bindings
///
/// Closes the server-side handle on drop.
pub struct Statement {
    conn: Rc<RefCell<Conn>>,
    log: Rc<dyn LogSink>,
    info: PreparedInfo,
    /// One slot per placeholder; `None` until bound
    params: Vec<Option<Param>>,
    handled_result_set: bool,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("info", &self.info)
            .field("params", &self.params)
            .field("handled_result_set", &self.handled_result_set)
            .finish_non_exhaustive()
    }
}

impl Statement {
    pub(crate) fn new(conn: Rc<RefCell<Conn>>, log: Rc<dyn LogSink>, info: PreparedInfo) -> Self {
        Self {
            conn,
            log,
            info,
            params: vec![None; info.num_params],
            handled_result_set: false,
        }
    }

    pub fn statement_id(&self) -> u32 {
        self.info.statement_id
    }

    /// Number of `?` placeholders reported by the server
    pub fn param_count(&self) -> usize {
        self.info.num_params
    }

    /// Number of result columns reported by the server at prepare time
    pub fn column_count(&self) -> usize {
        self.info.num_columns
    }

    /// Whether a result set of the latest execution was consumed through a host callback
    pub fn handled_result_set(&self) -> bool {
        self.handled_result_set
    }

    /// Bind `param` to the placeholder at `index` (0-based)
    pub fn bind_param(&mut self, index: usize, param: impl Into<Param>) -> Result<()> {
        let count = self.params.len();
        let slot = self.params.get_mut(index).ok_or_else(|| {
            Error::BadUsageError(format!(
                "parameter index {index} out of range, statement has {count} parameters"
            ))
        })?;
        *slot = Some(param.into());
        Ok(())
    }

    pub fn bind_null(&mut self, index: usize) -> Result<()> {
        self.bind_param(index, Param::Null)
    }

    pub fn bind_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.bind_param(index, value)
    }

    pub fn bind_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.bind_param(index, value)
    }

    pub fn bind_u64(&mut self, index: usize, value: u64) -> Result<()> {
        self.bind_param(index, value)
    }

    pub fn bind_f32(&mut self, index: usize, value: f32) -> Result<()> {
        self.bind_param(index, Param::Float(value))
    }

    pub fn bind_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.bind_param(index, value)
    }

    pub fn bind_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.bind_param(index, value)
    }

    pub fn bind_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.bind_param(index, Param::Bytes(value.to_vec()))
    }

    pub fn bind_date(&mut self, index: usize, value: DateTime) -> Result<()> {
        self.bind_param(index, Param::Date(value))
    }

    pub fn bind_time(&mut self, index: usize, value: Time) -> Result<()> {
        self.bind_param(index, Param::Time(value))
    }

    pub fn bind_datetime(&mut self, index: usize, value: DateTime) -> Result<()> {
        self.bind_param(index, Param::DateTime(value))
    }

    /// Unbind every placeholder
    pub fn clear_params(&mut self) {
        self.params.fill(None);
    }

    fn bound_params(&self) -> Result<Vec<Param>> {
        self.params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                param
                    .clone()
                    .ok_or_else(|| Error::BadUsageError(format!("parameter {index} is not bound")))
            })
            .collect()
    }

    /// Execute and store the result client-side
    ///
    /// Never fails: execution errors are logged and yield an invalid result set.
    pub fn execute_query(&mut self) -> ResultSet<'_> {
        self.handled_result_set = false;
        ResultSet::new(self)
    }

    /// Execute a statement that returns no rows (rows are discarded if it does)
    #[tracing::instrument(skip_all, fields(statement_id = self.info.statement_id))]
    pub fn execute_update(&mut self) -> Result<ExecuteOutcome> {
        let params = self.bound_params()?;
        let mut handler = DropHandler::default();
        borrow_conn(&self.conn)?.exec(
            self.info.statement_id,
            params.as_slice(),
            &mut handler,
        )?;
        Ok(handler.outcome())
    }

    /// Reset the server-side statement state and unbind all parameters
    pub fn reset(&mut self) -> Result<()> {
        borrow_conn(&self.conn)?.reset_statement(self.info.statement_id)?;
        self.clear_params();
        Ok(())
    }
}

impl ResultSetSource for Statement {
    #[tracing::instrument(skip_all, fields(statement_id = self.info.statement_id))]
    fn store_result(&mut self) -> Result<StoredResult> {
        let params = self.bound_params()?;
        let mut handler = StoreHandler::default();
        borrow_conn(&self.conn)?.exec(
            self.info.statement_id,
            params.as_slice(),
            &mut handler,
        )?;
        Ok(handler.into_result())
    }

    fn log_sink(&self) -> &dyn LogSink {
        &*self.log
    }

    fn mark_result_set_handled(&mut self) {
        self.handled_result_set = true;
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        let result = borrow_conn(&self.conn)
            .and_then(|mut conn| conn.close_statement(self.info.statement_id));
        if let Err(err) = result {
            self.log.log(&format!(
                "Statement::drop: failed to close statement {}: {err}",
                self.info.statement_id
            ));
        }
    }
}
