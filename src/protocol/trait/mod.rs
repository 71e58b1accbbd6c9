pub mod param;
pub mod params;

#[cfg(test)]
mod param_test;

use crate::error::Result;
use crate::protocol::BinaryRowPayload;
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::response::{OkPayloadBytes, ResultSetEnd};

/// Trait that defines event callbacks for binary protocol result sets
///
/// Events arrive in order: either `no_result_set`, or `resultset_start`, one `col` per
/// column, any number of `row`, then `resultset_end`.
pub trait BinaryResultSetHandler {
    fn no_result_set(&mut self, ok: OkPayloadBytes<'_>) -> Result<()>;
    fn resultset_start(&mut self, num_columns: usize) -> Result<()>;
    fn col(&mut self, col: ColumnDefinitionBytes<'_>) -> Result<()>;
    fn row(&mut self, row: &BinaryRowPayload<'_>) -> Result<()>;
    fn resultset_end(&mut self, end: ResultSetEnd<'_>) -> Result<()>;
}
