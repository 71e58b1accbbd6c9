use std::ops::Range;

use crate::col::Column;
use crate::error::{Error, Result};
use crate::protocol::BinaryResultSetHandler;
use crate::protocol::BinaryRowPayload;
use crate::protocol::command::prepared::Exec;
use crate::protocol::command::{ColumnDefinition, ColumnDefinitionBytes};
use crate::protocol::response::{EofPayload, OkPayload, OkPayloadBytes, ResultSetEnd};
use crate::protocol::value::Value;

/// Summary of a statement execution taken from its final OK (or EOF) packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub warnings: u16,
}

impl TryFrom<OkPayloadBytes<'_>> for ExecuteOutcome {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let ok = OkPayload::try_from(bytes)?;
        Ok(Self {
            affected_rows: ok.affected_rows,
            last_insert_id: ok.last_insert_id,
            warnings: ok.warnings,
        })
    }
}

impl TryFrom<ResultSetEnd<'_>> for ExecuteOutcome {
    type Error = Error;

    fn try_from(end: ResultSetEnd<'_>) -> Result<Self> {
        match end {
            ResultSetEnd::Ok(ok) => Self::try_from(ok),
            // a classic EOF carries no row counts
            ResultSetEnd::Eof(eof) => Ok(Self {
                warnings: EofPayload::try_from(eof)?.warnings,
                ..Self::default()
            }),
        }
    }
}

/// A handler that ignores all result set data but captures affected_rows and last_insert_id
///
/// Used by `Statement::execute_update()`, which discards rows but reports metadata.
#[derive(Debug, Default)]
pub struct DropHandler {
    outcome: ExecuteOutcome,
}

impl DropHandler {
    pub fn outcome(&self) -> ExecuteOutcome {
        self.outcome
    }
}

impl BinaryResultSetHandler for DropHandler {
    fn no_result_set(&mut self, ok: OkPayloadBytes<'_>) -> Result<()> {
        self.outcome = ExecuteOutcome::try_from(ok)?;
        Ok(())
    }

    fn resultset_start(&mut self, _: usize) -> Result<()> {
        Ok(())
    }

    fn col(&mut self, _: ColumnDefinitionBytes<'_>) -> Result<()> {
        Ok(())
    }

    fn row(&mut self, _: &BinaryRowPayload<'_>) -> Result<()> {
        Ok(())
    }

    fn resultset_end(&mut self, end: ResultSetEnd<'_>) -> Result<()> {
        self.outcome = ExecuteOutcome::try_from(end)?;
        Ok(())
    }
}

/// A complete result set held client-side
///
/// Rows are kept in their stored form (NULL bitmap followed by values) in one buffer
/// and decoded on demand.
#[derive(Debug, Default)]
pub struct StoredResult {
    /// `None` when the statement produced no result set
    columns: Option<Vec<Column>>,
    rows: Vec<u8>,
    row_ranges: Vec<Range<usize>>,
    outcome: ExecuteOutcome,
}

impl StoredResult {
    /// Replay a recorded `COM_STMT_EXECUTE` response
    pub fn from_payloads<'a, I>(payloads: I, deprecate_eof: bool) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut exec = Exec::new(deprecate_eof);
        let mut handler = StoreHandler::default();
        for payload in payloads {
            if exec.feed(payload, &mut handler)? {
                return Ok(handler.into_result());
            }
        }
        Err(Error::UnexpectedEof)
    }

    pub fn columns(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.row_ranges.len()
    }

    /// Stored form of row `index`
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        let range = self.row_ranges.get(index)?;
        self.rows.get(range.clone())
    }

    pub fn outcome(&self) -> ExecuteOutcome {
        self.outcome
    }
}

/// Buffers the whole response of an execute into a [`StoredResult`]
#[derive(Debug, Default)]
pub struct StoreHandler {
    result: StoredResult,
}

impl StoreHandler {
    pub fn into_result(self) -> StoredResult {
        self.result
    }

    /// Track the longest value per column. Malformed rows are left for the cursor to report.
    fn update_max_length(columns: &mut [Column], row: &BinaryRowPayload<'_>) {
        let null_bitmap = row.null_bitmap();
        let mut data = row.values();
        for (idx, column) in columns.iter_mut().enumerate() {
            if null_bitmap.is_null(idx) {
                continue;
            }
            let Ok((value, rest)) = Value::parse(&column.type_and_flags(), data) else {
                return;
            };
            let len = match value {
                Value::Byte(bytes) => bytes.len(),
                _ => data.len() - rest.len(),
            };
            column.max_length = column.max_length.max(len);
            data = rest;
        }
    }
}

impl BinaryResultSetHandler for StoreHandler {
    fn no_result_set(&mut self, ok: OkPayloadBytes<'_>) -> Result<()> {
        self.result.outcome = ExecuteOutcome::try_from(ok)?;
        Ok(())
    }

    fn resultset_start(&mut self, num_columns: usize) -> Result<()> {
        self.result.columns = Some(Vec::with_capacity(num_columns));
        Ok(())
    }

    fn col(&mut self, col: ColumnDefinitionBytes<'_>) -> Result<()> {
        let def = ColumnDefinition::try_from(col)?;
        let column = Column::try_from(&def)?;
        self.result
            .columns
            .as_mut()
            .ok_or_else(|| Error::LibraryBug(crate::error::eyre!("column before result set start")))?
            .push(column);
        Ok(())
    }

    fn row(&mut self, row: &BinaryRowPayload<'_>) -> Result<()> {
        if let Some(columns) = self.result.columns.as_mut() {
            Self::update_max_length(columns, row);
        }
        let start = self.result.rows.len();
        row.write_stored(&mut self.result.rows);
        self.result.row_ranges.push(start..self.result.rows.len());
        Ok(())
    }

    fn resultset_end(&mut self, end: ResultSetEnd<'_>) -> Result<()> {
        self.result.outcome = ExecuteOutcome::try_from(end)?;
        Ok(())
    }
}
