use std::borrow::Borrow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use prost::Message;
use strata_compress::Compressor;
use strata_dremel::{ShreddedColumn, shred_row};
use strata_error::{StrataError, StrataResult, strata_bail, strata_err};
use strata_io::OffsetWriter;
use strata_scalar::Row;
use strata_schema::Schema;

use crate::write::column::ColumnChunkWriter;
use crate::{FileMetadata, MAGIC_BYTES, RowGroupMetadata, WriteOptions, validate_row};

/// Creates Strata files.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    options: WriteOptions,
}

impl Writer {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Create a new file at `path` and open it for writing. Fails if the file already exists.
    pub fn open<P: AsRef<Path>, S: Into<Arc<Schema>>>(
        &self,
        path: P,
        schema: S,
    ) -> StrataResult<FileWriter<BufWriter<File>>> {
        let path = path.as_ref();
        let file = File::create_new(path).map_err(|err| {
            StrataError::from(err).with_context(format!("Failed to create {}", path.display()))
        })?;
        self.open_with(BufWriter::new(file), schema)
    }

    /// Start a file on an arbitrary sink.
    pub fn open_with<W: Write, S: Into<Arc<Schema>>>(
        &self,
        write: W,
        schema: S,
    ) -> StrataResult<FileWriter<W>> {
        FileWriter::try_new(write, schema.into(), self.options.clone())
    }

    /// Write `rows` to a new file at `path`.
    ///
    /// If a row is rejected the call fails and the file is left without a footer, which makes
    /// it unreadable. Removing it is up to the caller.
    pub fn write<P, S, I>(&self, path: P, schema: S, rows: I) -> StrataResult<FileMetadata>
    where
        P: AsRef<Path>,
        S: Into<Arc<Schema>>,
        I: IntoIterator,
        I::Item: Borrow<Row>,
    {
        let mut writer = self.open(path, schema)?;
        writer.write_batch(rows)?;
        let metadata = writer.close()?;
        writer.into_inner()?;
        Ok(metadata)
    }
}

/// An open file being written row by row.
///
/// Rows are validated, shredded and buffered in memory. Every
/// [`row_group_size_check_interval`](WriteOptions::row_group_size_check_interval) rows the
/// buffered size is estimated, and once it reaches the row group size the buffer is written
/// out as a row group. Nothing is readable until [`close`](Self::close) writes the footer.
pub struct FileWriter<W: Write> {
    out: OffsetWriter<W>,
    schema: Arc<Schema>,
    options: WriteOptions,
    compressor: Compressor,
    columns: Vec<ShreddedColumn>,
    chunks: Vec<ColumnChunkWriter>,
    row_groups: Vec<RowGroupMetadata>,
    buffered_rows: usize,
    closed: bool,
}

impl<W: Write> FileWriter<W> {
    fn try_new(write: W, schema: Arc<Schema>, options: WriteOptions) -> StrataResult<Self> {
        options.validate()?;
        let compressor = Compressor::try_new(options.compression(), options.gzip_level())?;
        let chunks = schema
            .leaves()
            .iter()
            .map(|leaf| ColumnChunkWriter::new(leaf.clone(), options.page_size_bytes()))
            .collect();
        let mut out = OffsetWriter::new(write);
        out.write_all(&MAGIC_BYTES)?;
        Ok(Self {
            out,
            columns: vec![ShreddedColumn::new(); schema.leaves().len()],
            schema,
            options,
            compressor,
            chunks,
            row_groups: Vec::new(),
            buffered_rows: 0,
            closed: false,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Rows written so far, buffered or flushed.
    pub fn num_rows(&self) -> u64 {
        self.row_groups.iter().map(|rg| rg.num_rows()).sum::<u64>() + self.buffered_rows as u64
    }

    /// Validate and buffer one row, flushing the row group if it has grown large enough.
    ///
    /// A rejected row leaves the buffered rows untouched.
    pub fn write_row(&mut self, row: &Row) -> StrataResult<()> {
        self.check_open()?;
        if self.options.validation() {
            validate_row(&self.schema, row)?;
        }
        shred_row(&self.schema, row, &mut self.columns)?;
        for (chunk, column) in self.chunks.iter_mut().zip(&self.columns) {
            chunk.end_row(column);
        }
        self.buffered_rows += 1;

        if self.buffered_rows % self.options.row_group_size_check_interval() == 0
            && self.buffered_bytes() >= self.options.row_group_size_bytes()
        {
            self.flush_row_group()?;
        }
        Ok(())
    }

    pub fn write_batch<I>(&mut self, rows: I) -> StrataResult<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Row>,
    {
        for row in rows {
            self.write_row(row.borrow())?;
        }
        Ok(())
    }

    /// Flush the buffered rows and write the footer.
    pub fn close(&mut self) -> StrataResult<FileMetadata> {
        self.check_open()?;
        self.closed = true;
        self.flush_row_group()?;

        let metadata = FileMetadata::new(
            self.schema.clone(),
            self.options.created_by().map(str::to_string),
            std::mem::take(&mut self.row_groups),
        );
        let footer = metadata.to_proto()?.encode_to_vec();
        let footer_len = u32::try_from(footer.len())
            .map_err(|_| strata_err!("Footer of {} bytes exceeds u32::MAX", footer.len()))?;
        self.out.write_all(&footer)?;
        self.out.write_all(&footer_len.to_le_bytes())?;
        self.out.write_all(&MAGIC_BYTES)?;
        self.out.flush()?;
        debug!(
            "Closed file with {} rows in {} row groups, {} bytes",
            metadata.num_rows(),
            metadata.row_groups().len(),
            self.out.position()
        );
        Ok(metadata)
    }

    /// Return the underlying sink. Without a prior [`close`](Self::close) the output is
    /// incomplete.
    pub fn into_inner(self) -> StrataResult<W> {
        Ok(self.out.into_inner()?)
    }

    fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(ColumnChunkWriter::buffered_bytes).sum()
    }

    fn flush_row_group(&mut self) -> StrataResult<()> {
        if self.buffered_rows == 0 {
            return Ok(());
        }
        let file_offset = self.out.position();
        let estimated = self.buffered_bytes();
        let columns = self
            .chunks
            .iter_mut()
            .zip(self.columns.iter_mut())
            .map(|(chunk, column)| {
                chunk.flush(column.take(), &mut self.out, &self.compressor, &self.options)
            })
            .try_collect::<_, Vec<_>, _>()?;
        let total_byte_size = self.out.position() - file_offset;
        debug!(
            "Flushed row group {} with {} rows at offset {}: {} bytes, estimated {}",
            self.row_groups.len(),
            self.buffered_rows,
            file_offset,
            total_byte_size,
            estimated
        );
        self.row_groups.push(RowGroupMetadata::new(
            self.buffered_rows as u64,
            file_offset,
            total_byte_size,
            columns,
        ));
        self.buffered_rows = 0;
        Ok(())
    }

    fn check_open(&self) -> StrataResult<()> {
        if self.closed {
            strata_bail!("File writer is already closed");
        }
        Ok(())
    }
}
