//! Lazy, keyset-paginated row producer
//!
//! A cursor runs its query one page at a time, resuming after the last
//! `rowid` it has seen, so memory stays bounded by the page size no matter
//! how large the table is. Each query must select `rowid` as its first
//! column and take the parameters `(key?, after_rowid, limit)`.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use rusqlite::{Connection, Row, params};

use crate::{Error, Result};

/// Converts one row (after the leading `rowid`) into an item
pub(crate) type RowMapper<T> = fn(&Row<'_>) -> Result<T>;

/// Restartable sequence of query results.
///
/// Yields `Result<T>`. Rows mapped before a failure are yielded first, then
/// the error, and then the cursor is exhausted. Borrowing the graph
/// keeps it from being mutated while the cursor is alive.
pub struct Cursor<'g, T> {
    conn: &'g Connection,
    sql: &'static str,
    key: Option<String>,
    map: RowMapper<T>,
    page_size: usize,
    last_rowid: i64,
    buffer: VecDeque<T>,
    pending: Option<Error>,
    done: bool,
}

impl<'g, T> Cursor<'g, T> {
    pub(crate) fn new(
        conn: &'g Connection,
        sql: &'static str,
        key: Option<String>,
        map: RowMapper<T>,
        page_size: usize,
    ) -> Self {
        Self {
            conn,
            sql,
            key,
            map,
            page_size: page_size.max(1),
            last_rowid: i64::MIN,
            buffer: VecDeque::new(),
            pending: None,
            done: false,
        }
    }

    /// Start over from the first row
    pub fn rewind(&mut self) {
        self.last_rowid = i64::MIN;
        self.buffer.clear();
        self.pending = None;
        self.done = false;
    }

    fn fetch_page(&mut self) -> Result<()> {
        let conn = self.conn;
        let mut stmt = conn.prepare_cached(self.sql)?;
        let limit = self.page_size as i64;

        let mut rows = match &self.key {
            Some(key) => stmt.query(params![key, self.last_rowid, limit])?,
            None => stmt.query(params![self.last_rowid, limit])?,
        };

        let mut fetched = 0;
        while let Some(row) = rows.next()? {
            self.last_rowid = row.get(0)?;
            self.buffer.push_back((self.map)(row)?);
            fetched += 1;
        }

        if fetched < self.page_size {
            self.done = true;
        }
        Ok(())
    }
}

impl<T> Iterator for Cursor<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            if let Err(e) = self.fetch_page() {
                // keep what the page produced before the failure
                self.pending = Some(e);
                self.done = true;
            }
        }
        match self.buffer.pop_front() {
            Some(item) => Some(Ok(item)),
            None => self.pending.take().map(Err),
        }
    }
}

impl<T> FusedIterator for Cursor<'_, T> {}
