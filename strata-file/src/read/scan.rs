use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use strata_dremel::{Assembler, Projection};
use strata_error::{StrataResult, strata_bail};
use strata_io::ReadAt;
use strata_scalar::Row;

use crate::FileMetadata;
use crate::read::page::PageCursor;

/// A window of rows: skip `offset` rows, then return at most `limit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    offset: i64,
    limit: Option<i64>,
}

impl Pagination {
    /// Fails with `InvalidPagination` for a negative offset or a limit below one.
    pub fn try_new(offset: i64, limit: Option<i64>) -> StrataResult<Self> {
        if offset < 0 {
            strata_bail!(InvalidPagination: "Offset must be greater than or equal to 0");
        }
        if limit.is_some_and(|limit| limit <= 0) {
            strata_bail!(InvalidPagination: "Limit must be greater than 0");
        }
        Ok(Self { offset, limit })
    }

    pub fn offset(&self) -> u64 {
        self.offset.unsigned_abs()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit.map(i64::unsigned_abs)
    }
}

/// Configures which columns and rows of a file to read.
pub struct ScanBuilder<R> {
    read: Arc<R>,
    metadata: Arc<FileMetadata>,
    columns: Vec<String>,
    offset: i64,
    limit: Option<i64>,
}

impl<R: ReadAt> ScanBuilder<R> {
    pub(crate) fn new(read: Arc<R>, metadata: Arc<FileMetadata>) -> Self {
        Self {
            read,
            metadata,
            columns: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    /// Read only the named columns: top-level names or dotted paths to nested ones. An empty
    /// list reads every column.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.offset = pagination.offset;
        self.limit = pagination.limit;
        self
    }

    /// Check the configuration and start iterating.
    ///
    /// Pagination is checked before anything else, and no page is read until the first row is
    /// requested.
    pub fn into_rows(self) -> StrataResult<RowIterator<R>> {
        let pagination = Pagination::try_new(self.offset, self.limit)?;
        let projection = Projection::try_new(self.metadata.schema(), &self.columns)?;
        Ok(RowIterator::new(
            self.read,
            self.metadata,
            projection,
            pagination,
        ))
    }
}

/// Rows of a file, assembled one row group at a time.
///
/// Row groups that lie entirely before the offset are skipped without reading any of their
/// pages. Within a row group only the pages of projected columns are read.
pub struct RowIterator<R> {
    read: Arc<R>,
    metadata: Arc<FileMetadata>,
    projection: Projection,
    next_row_group: usize,
    skip: u64,
    remaining: Option<u64>,
    current: Option<Assembler<PageCursor<R>>>,
    failed: bool,
}

impl<R: ReadAt> RowIterator<R> {
    fn new(
        read: Arc<R>,
        metadata: Arc<FileMetadata>,
        projection: Projection,
        pagination: Pagination,
    ) -> Self {
        let mut skip = pagination.offset();
        let mut next_row_group = 0;
        for row_group in metadata.row_groups() {
            if row_group.num_rows() > skip {
                break;
            }
            skip -= row_group.num_rows();
            next_row_group += 1;
        }
        if next_row_group > 0 {
            debug!(
                "Skipping {} of {} row groups before offset {}",
                next_row_group,
                metadata.row_groups().len(),
                pagination.offset()
            );
        }
        Self {
            read,
            metadata,
            projection,
            next_row_group,
            skip,
            remaining: pagination.limit(),
            current: None,
            failed: false,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn next_row(&mut self) -> StrataResult<Option<Row>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        loop {
            if let Some(assembler) = &mut self.current {
                if let Some(row) = assembler.next_row()? {
                    if let Some(remaining) = &mut self.remaining {
                        *remaining -= 1;
                    }
                    return Ok(Some(row));
                }
                self.current = None;
            }
            if self.next_row_group >= self.metadata.row_groups().len() {
                return Ok(None);
            }
            self.current = Some(self.open_row_group()?);
        }
    }

    fn open_row_group(&mut self) -> StrataResult<Assembler<PageCursor<R>>> {
        let index = self.next_row_group;
        self.next_row_group += 1;
        let skip = std::mem::take(&mut self.skip);
        let schema = self.metadata.schema();
        let row_group = &self.metadata.row_groups()[index];
        debug!(
            "Reading row group {} with {} rows, skipping {}",
            index,
            row_group.num_rows(),
            skip
        );
        let mut sources = self
            .projection
            .leaves()
            .iter()
            .map(|&leaf| {
                PageCursor::try_new(
                    self.read.clone(),
                    schema.leaves()[leaf].clone(),
                    row_group.columns()[leaf].clone(),
                )
            })
            .try_collect::<_, Vec<_>, _>()?;
        for source in &mut sources {
            source.skip_rows(skip)?;
        }
        Assembler::try_new(schema, &self.projection, sources)
    }
}

impl<R: ReadAt> Iterator for RowIterator<R> {
    type Item = StrataResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_row().transpose();
        self.failed = matches!(next, Some(Err(_)));
        next
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strata_error::StrataError;

    use super::*;

    #[rstest]
    #[case(-1, None, "Offset must be greater than or equal to 0")]
    #[case(0, Some(0), "Limit must be greater than 0")]
    #[case(3, Some(-5), "Limit must be greater than 0")]
    fn invalid_pagination(#[case] offset: i64, #[case] limit: Option<i64>, #[case] message: &str) {
        let err = Pagination::try_new(offset, limit).unwrap_err();
        assert!(matches!(err, StrataError::InvalidPagination(..)));
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn valid_pagination() {
        let pagination = Pagination::try_new(10, Some(5)).unwrap();
        assert_eq!(pagination.offset(), 10);
        assert_eq!(pagination.limit(), Some(5));
        assert_eq!(Pagination::default().limit(), None);
    }
}
