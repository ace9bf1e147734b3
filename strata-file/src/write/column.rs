use std::io::Write;

use log::trace;
use strata_compress::Compressor;
use strata_dremel::ShreddedColumn;
use strata_encoding::Encoding;
use strata_encoding::bitpack::bit_width;
use strata_encoding::dict::{DictEncoder, dict_encode_indices};
use strata_encoding::levels::encode_levels;
use strata_encoding::plain::{plain_encode, plain_size};
use strata_error::{StrataResult, strata_err};
use strata_io::OffsetWriter;
use strata_scalar::Value;
use strata_schema::{LeafDescriptor, PhysicalType};

use crate::{ColumnChunkMetadata, PageMetadata, Statistics, WriteOptions};

/// Tracks the buffered triples of one leaf column and writes them out as a column chunk.
///
/// The triples themselves live in a [`ShreddedColumn`] owned by the file writer, which is
/// handed in after every row and again when the row group is flushed. Data pages are cut at
/// row boundaries once their estimated size reaches the page size.
pub(crate) struct ColumnChunkWriter {
    leaf: LeafDescriptor,
    page_size: usize,
    level_bits: usize,
    /// Pages completed so far in the current row group.
    pages: Vec<PageSpan>,
    entries: usize,
    values: usize,
    page_rows: u32,
    /// Estimated value bytes and level bits of the open page.
    page_bytes: usize,
    page_level_bits: usize,
    buffered_bytes: usize,
    buffered_level_bits: usize,
}

/// The end of a data page within the buffered column.
#[derive(Debug, Clone, Copy)]
struct PageSpan {
    entries: usize,
    values: usize,
    rows: u32,
}

/// The values of a data page, either as themselves or as dictionary indices.
enum PageValues<'a> {
    Plain(&'a [Value]),
    Indices(&'a [u32], usize),
}

impl ColumnChunkWriter {
    pub fn new(leaf: LeafDescriptor, page_size: usize) -> Self {
        let level_bits =
            usize::from(bit_width(leaf.max_def().into()) + bit_width(leaf.max_rep().into()));
        Self {
            leaf,
            page_size,
            level_bits,
            pages: Vec::new(),
            entries: 0,
            values: 0,
            page_rows: 0,
            page_bytes: 0,
            page_level_bits: 0,
            buffered_bytes: 0,
            buffered_level_bits: 0,
        }
    }

    /// Account for the triples of the row that was just shredded into `column`.
    pub fn end_row(&mut self, column: &ShreddedColumn) {
        let entries = column.len();
        let values = column.values().len();
        let level_bits = (entries - self.entries) * self.level_bits;
        let bytes = column.values()[self.values..]
            .iter()
            .map(plain_size)
            .sum::<usize>();
        self.entries = entries;
        self.values = values;
        self.page_rows += 1;
        self.page_bytes += bytes;
        self.page_level_bits += level_bits;
        self.buffered_bytes += bytes;
        self.buffered_level_bits += level_bits;
        if self.page_bytes + self.page_level_bits.div_ceil(8) >= self.page_size {
            self.pages.push(PageSpan {
                entries,
                values,
                rows: self.page_rows,
            });
            self.page_rows = 0;
            self.page_bytes = 0;
            self.page_level_bits = 0;
        }
    }

    /// Estimated encoded size of the buffered triples, before compression.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes + self.buffered_level_bits.div_ceil(8)
    }

    /// Encode, compress and write `column` as one column chunk, then reset for the next row
    /// group.
    pub fn flush<W: Write>(
        &mut self,
        column: ShreddedColumn,
        out: &mut OffsetWriter<W>,
        compressor: &Compressor,
        options: &WriteOptions,
    ) -> StrataResult<ColumnChunkMetadata> {
        let mut pages = std::mem::take(&mut self.pages);
        if self.page_rows > 0 {
            pages.push(PageSpan {
                entries: self.entries,
                values: self.values,
                rows: self.page_rows,
            });
        }
        self.entries = 0;
        self.values = 0;
        self.page_rows = 0;
        self.page_bytes = 0;
        self.page_level_bits = 0;
        self.buffered_bytes = 0;
        self.buffered_level_bits = 0;

        let leaf_type = self.leaf.leaf_type();
        let dictionary = self.dictionary(column.values(), options)?;
        let statistics = Statistics::compute(
            column.values(),
            column.len(),
            dictionary.as_ref().map(|(dict, _)| dict.len()),
        );
        let file_offset = out.position();

        let dictionary_page = dictionary
            .as_ref()
            .map(|(dict, _)| {
                let body = dict.dictionary_page()?;
                write_page(out, compressor, Encoding::Plain, &body, to_u32(dict.len())?, 0)
            })
            .transpose()?;
        let encoding = if dictionary.is_some() {
            Encoding::RleDictionary
        } else {
            Encoding::Plain
        };

        let mut data_pages = Vec::with_capacity(pages.len());
        let mut start = PageSpan {
            entries: 0,
            values: 0,
            rows: 0,
        };
        for end in pages {
            let values = match &dictionary {
                Some((dict, indices)) => {
                    PageValues::Indices(&indices[start.values..end.values], dict.len())
                }
                None => PageValues::Plain(&column.values()[start.values..end.values]),
            };
            let body = self.page_body(
                &column.def_levels()[start.entries..end.entries],
                &column.rep_levels()[start.entries..end.entries],
                values,
            )?;
            data_pages.push(write_page(
                out,
                compressor,
                encoding,
                &body,
                to_u32(end.entries - start.entries)?,
                end.rows,
            )?);
            start = end;
        }
        trace!(
            "Wrote column chunk \"{}\" with {} data pages, {} encoding",
            self.leaf.path(),
            data_pages.len(),
            encoding
        );

        Ok(ColumnChunkMetadata::new(
            self.leaf.path().clone(),
            leaf_type.physical(),
            compressor.codec(),
            encoding,
            file_offset,
            column.len() as u64,
            dictionary_page,
            data_pages,
            Some(statistics),
        ))
    }

    /// Dictionary encode `values` if the column chunk qualifies.
    ///
    /// Booleans are never dictionary encoded. Other columns are when their distinct values are
    /// few enough relative to the total and their PLAIN encoding fits in one dictionary page.
    fn dictionary(
        &self,
        values: &[Value],
        options: &WriteOptions,
    ) -> StrataResult<Option<(DictEncoder, Vec<u32>)>> {
        if values.is_empty() || self.leaf.leaf_type().physical() == PhysicalType::Boolean {
            return Ok(None);
        }
        #[allow(clippy::cast_precision_loss)]
        let max_distinct = values.len() as f64 * options.dictionary_min_cardinality_ratio();
        let mut dict = DictEncoder::new(*self.leaf.leaf_type());
        let mut indices = Vec::with_capacity(values.len());
        for value in values {
            indices.push(dict.encode(value)?);
            #[allow(clippy::cast_precision_loss)]
            let too_many = dict.len() as f64 > max_distinct;
            if too_many || dict.plain_size() > options.dictionary_page_size_bytes() {
                return Ok(None);
            }
        }
        Ok(Some((dict, indices)))
    }

    fn page_body(
        &self,
        def_levels: &[u16],
        rep_levels: &[u16],
        values: PageValues<'_>,
    ) -> StrataResult<Vec<u8>> {
        let mut body = Vec::new();
        for (levels, max) in [
            (rep_levels, self.leaf.max_rep()),
            (def_levels, self.leaf.max_def()),
        ] {
            if max > 0 {
                let encoded = encode_levels(levels, max);
                body.extend_from_slice(&to_u32(encoded.len())?.to_le_bytes());
                body.extend_from_slice(&encoded);
            }
        }
        match values {
            PageValues::Plain(values) => {
                body.extend_from_slice(&plain_encode(self.leaf.leaf_type(), values)?)
            }
            PageValues::Indices(indices, dict_len) => {
                body.extend_from_slice(&dict_encode_indices(indices, dict_len))
            }
        }
        Ok(body)
    }
}

fn write_page<W: Write>(
    out: &mut OffsetWriter<W>,
    compressor: &Compressor,
    encoding: Encoding,
    body: &[u8],
    num_values: u32,
    num_rows: u32,
) -> StrataResult<PageMetadata> {
    let compressed = compressor.compress(body)?;
    let offset = out.position();
    out.write_all(&compressed)?;
    Ok(PageMetadata::new(
        encoding,
        compressor.codec(),
        offset,
        to_u32(compressed.len())?,
        to_u32(body.len())?,
        num_values,
        num_rows,
    ))
}

fn to_u32(len: usize) -> StrataResult<u32> {
    u32::try_from(len).map_err(|_| strata_err!("Page size {} exceeds u32::MAX", len))
}

#[cfg(test)]
mod tests {
    use strata_dremel::shred_row;
    use strata_scalar::{Row, Value};
    use strata_schema::{Column, Schema};

    use super::*;

    fn buffered(schema: &Schema, rows: &[Row], page_size: usize) -> (ColumnChunkWriter, ShreddedColumn) {
        let mut columns = vec![ShreddedColumn::new()];
        let mut writer = ColumnChunkWriter::new(schema.leaves()[0].clone(), page_size);
        for row in rows {
            shred_row(schema, row, &mut columns).unwrap();
            writer.end_row(&columns[0]);
        }
        (writer, columns.remove(0))
    }

    #[test]
    fn repeated_values_use_a_dictionary() {
        let schema = Schema::try_new([Column::string("s")]).unwrap();
        let rows: Vec<Row> = (0..100)
            .map(|i| Row::new().with("s", if i % 2 == 0 { "even" } else { "odd" }))
            .collect();
        let (mut writer, column) = buffered(&schema, &rows, 1 << 20);
        let mut out = OffsetWriter::new(Vec::new());
        let chunk = writer
            .flush(column, &mut out, &Compressor::default(), &WriteOptions::default())
            .unwrap();

        assert_eq!(chunk.encoding().unwrap(), Encoding::RleDictionary);
        assert_eq!(chunk.dictionary_page().unwrap().num_values(), 2);
        assert_eq!(chunk.data_pages().len(), 1);
        assert_eq!(chunk.data_pages()[0].num_rows(), 100);
        assert_eq!(chunk.statistics().unwrap().distinct_count(), Some(2));
        assert_eq!(chunk.total_compressed_size(), out.position());
        assert_eq!(writer.buffered_bytes(), 0);
    }

    #[test]
    fn unique_values_stay_plain() {
        let schema = Schema::try_new([Column::int64("v").required()]).unwrap();
        let rows: Vec<Row> = (0..100i64).map(|i| Row::new().with("v", i)).collect();
        let (mut writer, column) = buffered(&schema, &rows, 1 << 20);
        assert_eq!(writer.buffered_bytes(), 800);
        let mut out = OffsetWriter::new(Vec::new());
        let chunk = writer
            .flush(column, &mut out, &Compressor::default(), &WriteOptions::default())
            .unwrap();
        assert_eq!(chunk.encoding().unwrap(), Encoding::Plain);
        assert!(chunk.dictionary_page().is_none());
        // no levels for a required top-level column
        assert_eq!(chunk.data_pages()[0].uncompressed_size(), 800);
    }

    #[test]
    fn level_bits_add_up_across_rows() {
        let schema = Schema::try_new([Column::boolean("b")]).unwrap();
        let rows: Vec<Row> = (0..64).map(|_| Row::new().with("b", Value::Null)).collect();
        let (writer, _) = buffered(&schema, &rows, 1 << 20);
        // one definition bit per null row
        assert_eq!(writer.buffered_bytes(), 8);

        let (writer, _) = buffered(&schema, &rows[..3], 1 << 20);
        assert_eq!(writer.buffered_bytes(), 1);
    }

    #[test]
    fn pages_break_at_row_boundaries() {
        let schema = Schema::try_new([Column::list("l", Column::int32("element").required())])
            .unwrap();
        let rows: Vec<Row> = (0..10)
            .map(|i| Row::new().with("l", (0..i).collect::<Vec<i32>>()))
            .collect();
        let (mut writer, column) = buffered(&schema, &rows, 16);
        let mut out = OffsetWriter::new(Vec::new());
        let options = WriteOptions::default().with_dictionary_min_cardinality_ratio(0.01);
        let chunk = writer
            .flush(column, &mut out, &Compressor::default(), &options)
            .unwrap();

        let pages = chunk.data_pages();
        assert!(pages.len() > 1);
        assert_eq!(pages.iter().map(|p| p.num_rows()).sum::<u32>(), 10);
        assert_eq!(
            pages.iter().map(|p| u64::from(p.num_values())).sum::<u64>(),
            chunk.num_values()
        );
        // the empty list of row 0 is one placeholder entry
        assert_eq!(chunk.num_values(), 1 + 45);
        assert_eq!(chunk.statistics().unwrap().null_count(), 1);
    }
}
