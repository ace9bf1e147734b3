use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace};
use strata_dremel::{ColumnCursor, ShreddedColumn, TripleSource};
use strata_encoding::Encoding;
use strata_encoding::dict::{dict_decode_indices, dict_lookup};
use strata_encoding::levels::decode_levels;
use strata_encoding::plain::plain_decode;
use strata_error::{StrataResult, strata_bail, strata_err};
use strata_io::ReadAt;
use strata_scalar::Value;
use strata_schema::LeafDescriptor;

use crate::{ColumnChunkMetadata, PageMetadata};

/// The triples of one column chunk, read page by page as the assembler reaches them.
pub(crate) struct PageCursor<R> {
    read: Arc<R>,
    leaf: LeafDescriptor,
    chunk: ColumnChunkMetadata,
    next_page: usize,
    dictionary: Option<Vec<Value>>,
    current: Option<ColumnCursor>,
}

impl<R: ReadAt> PageCursor<R> {
    /// Fails if any page of the chunk uses an encoding that cannot be decoded.
    pub fn try_new(
        read: Arc<R>,
        leaf: LeafDescriptor,
        chunk: ColumnChunkMetadata,
    ) -> StrataResult<Self> {
        for page in chunk.data_pages() {
            let encoding = page.encoding()?;
            if !encoding.is_supported() {
                strata_bail!(
                    UnsupportedEncoding: "Encoding {} of column \"{}\" is not supported",
                    encoding,
                    leaf.path()
                );
            }
        }
        if let Some(page) = chunk.dictionary_page() {
            let encoding = page.encoding()?;
            if !matches!(encoding, Encoding::Plain | Encoding::PlainDictionary) {
                strata_bail!(
                    UnsupportedEncoding: "Dictionary encoding {} of column \"{}\" is not supported",
                    encoding,
                    leaf.path()
                );
            }
        }
        Ok(Self {
            read,
            leaf,
            chunk,
            next_page: 0,
            dictionary: None,
            current: None,
        })
    }

    /// Skip the first `rows` rows, without reading the pages that lie entirely within them.
    pub fn skip_rows(&mut self, mut rows: u64) -> StrataResult<()> {
        if self.current.is_none() {
            while let Some(page) = self.chunk.data_pages().get(self.next_page) {
                let page_rows = u64::from(page.num_rows());
                if page_rows > rows {
                    break;
                }
                rows -= page_rows;
                self.next_page += 1;
            }
        }
        if rows > 0 {
            trace!(
                "Skipping {} rows of column \"{}\" in page {}",
                rows,
                self.leaf.path(),
                self.next_page
            );
        }
        for _ in 0..rows {
            self.consume()?;
            while let Some((_, rep)) = self.peek()? {
                if rep == 0 {
                    break;
                }
                self.consume()?;
            }
        }
        Ok(())
    }

    fn load_next_page(&mut self) -> StrataResult<bool> {
        let Some(page) = self.chunk.data_pages().get(self.next_page).copied() else {
            self.current = None;
            return Ok(false);
        };
        let index = self.next_page;
        self.next_page += 1;
        let column = self.decode_page(&page).map_err(|err| {
            err.with_context(format!("Column \"{}\" page {}", self.leaf.path(), index))
        })?;
        trace!(
            "Decoded page {} of column \"{}\": {} entries, {} values",
            index,
            self.leaf.path(),
            column.len(),
            column.values().len()
        );
        self.current = Some(ColumnCursor::new(column, self.leaf.max_def()));
        Ok(true)
    }

    fn decode_page(&mut self, page: &PageMetadata) -> StrataResult<ShreddedColumn> {
        let body = self.fetch(page)?;
        let count = page.num_values() as usize;
        let max_def = self.leaf.max_def();
        let mut pos = 0;
        let rep_levels = read_levels(&body, &mut pos, self.leaf.max_rep(), count)?;
        let def_levels = read_levels(&body, &mut pos, max_def, count)?;
        let present = def_levels.iter().filter(|&&def| def == max_def).count();

        let data = body.slice(pos..);
        let values = if page.encoding()?.is_dictionary() {
            let indices = dict_decode_indices(&data, present)?;
            dict_lookup(self.dictionary()?, &indices)?
        } else {
            plain_decode(self.leaf.leaf_type(), &data, present)?
        };
        ShreddedColumn::try_from_parts(def_levels, rep_levels, values, max_def)
    }

    fn dictionary(&mut self) -> StrataResult<&[Value]> {
        if self.dictionary.is_none() {
            let page = self.chunk.dictionary_page().copied().ok_or_else(|| {
                strata_err!(
                    Corrupted: "Column \"{}\" has dictionary encoded pages but no dictionary",
                    self.leaf.path()
                )
            })?;
            let body = self.fetch(&page)?;
            let values = plain_decode(self.leaf.leaf_type(), &body, page.num_values() as usize)?;
            debug!(
                "Loaded dictionary of column \"{}\" with {} values",
                self.leaf.path(),
                values.len()
            );
            self.dictionary = Some(values);
        }
        Ok(self.dictionary.as_deref().unwrap_or_default())
    }

    /// Read and decompress a page body, dispatching on the codec recorded for the page.
    fn fetch(&self, page: &PageMetadata) -> StrataResult<Bytes> {
        let codec = page.codec()?;
        let start = page.offset();
        let end = start
            .checked_add(u64::from(page.compressed_size()))
            .ok_or_else(|| {
                strata_err!(
                    Corrupted: "Page at offset {} with {} bytes runs past the end of the address space",
                    start,
                    page.compressed_size()
                )
            })?;
        let data = self.read.read_byte_range(start..end)?;
        codec.decompress(data, page.uncompressed_size() as usize)
    }
}

impl<R: ReadAt> TripleSource for PageCursor<R> {
    fn peek(&mut self) -> StrataResult<Option<(u16, u16)>> {
        loop {
            if let Some(cursor) = &mut self.current {
                if let Some(levels) = cursor.peek()? {
                    return Ok(Some(levels));
                }
            }
            if !self.load_next_page()? {
                return Ok(None);
            }
        }
    }

    fn consume(&mut self) -> StrataResult<Option<Value>> {
        self.peek()?;
        match self.current.as_mut() {
            Some(cursor) => cursor.consume(),
            None => strata_bail!(
                Corrupted: "Column \"{}\" ended before the row was complete",
                self.leaf.path()
            ),
        }
    }
}

/// Read one length-prefixed level stream starting at `pos`. Columns whose maximum level is zero
/// store no stream and every level is zero.
fn read_levels(body: &Bytes, pos: &mut usize, max_level: u16, count: usize) -> StrataResult<Vec<u16>> {
    if max_level == 0 {
        return Ok(vec![0; count]);
    }
    let truncated = || strata_err!(Corrupted: "Level stream is truncated");
    let len: [u8; 4] = body
        .get(*pos..*pos + 4)
        .and_then(|len| len.try_into().ok())
        .ok_or_else(truncated)?;
    let start = *pos + 4;
    let end = start + u32::from_le_bytes(len) as usize;
    let data = body.get(start..end).ok_or_else(truncated)?;
    *pos = end;
    decode_levels(data, max_level, count)
}

#[cfg(test)]
mod tests {
    use strata_compress::CompressionCodec;
    use strata_scalar::Row;
    use strata_schema::{Column, Schema};

    use super::*;
    use crate::{Reader, WriteOptions, Writer};

    fn open(rows: usize, codec: CompressionCodec) -> (Bytes, ColumnChunkMetadata, LeafDescriptor) {
        let schema = Schema::try_new([Column::list("l", Column::string("element"))]).unwrap();
        let options = WriteOptions::default()
            .with_compression(codec)
            .with_page_size_bytes(64);
        let mut writer = Writer::new(options).open_with(Vec::new(), schema).unwrap();
        for i in 0..rows {
            let items = (0..i % 4).map(|j| format!("v{}", j % 2)).collect::<Vec<_>>();
            writer.write_row(&Row::new().with("l", items)).unwrap();
        }
        writer.close().unwrap();
        let bytes = Bytes::from(writer.into_inner().unwrap());
        let file = Reader::default().read_bytes(bytes.clone()).unwrap();
        let chunk = file.metadata().row_groups()[0].columns()[0].clone();
        let leaf = file.schema().leaves()[0].clone();
        (bytes, chunk, leaf)
    }

    fn rows_of(cursor: &mut PageCursor<Bytes>) -> usize {
        let mut rows = 0;
        while let Some((_, rep)) = cursor.peek().unwrap() {
            if rep == 0 {
                rows += 1;
            }
            cursor.consume().unwrap();
        }
        rows
    }

    #[test]
    fn reads_every_page() {
        let (bytes, chunk, leaf) = open(50, CompressionCodec::Snappy);
        assert!(chunk.data_pages().len() > 1);
        assert!(chunk.dictionary_page().is_some());
        let mut cursor = PageCursor::try_new(Arc::new(bytes), leaf, chunk).unwrap();
        assert_eq!(rows_of(&mut cursor), 50);
        assert!(cursor.consume().is_err());
    }

    #[test]
    fn skips_whole_pages_and_partial_rows() {
        let (bytes, chunk, leaf) = open(50, CompressionCodec::Gzip);
        let first_page_rows = u64::from(chunk.data_pages()[0].num_rows());
        let mut cursor = PageCursor::try_new(Arc::new(bytes), leaf, chunk).unwrap();
        cursor.skip_rows(first_page_rows + 1).unwrap();
        assert_eq!(cursor.next_page, 2);
        assert_eq!(cursor.peek().unwrap().map(|(_, rep)| rep), Some(0));
        assert_eq!(rows_of(&mut cursor) as u64, 50 - first_page_rows - 1);
    }

    #[test]
    fn missing_level_bytes_are_corrupt() {
        let mut pos = 0;
        let body = Bytes::from_static(&[10, 0, 0, 0, 1]);
        assert!(read_levels(&body, &mut pos, 1, 3).is_err());
        assert_eq!(read_levels(&body, &mut pos, 0, 3).unwrap(), [0, 0, 0]);
    }
}
