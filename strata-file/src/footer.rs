//! File metadata parsed from, and serialized into, the footer.

use std::sync::Arc;

use itertools::Itertools;
use strata_compress::CompressionCodec;
use strata_encoding::Encoding;
use strata_error::{StrataResult, strata_bail, strata_err};
use strata_proto::footer as pb;
use strata_schema::{ColumnPath, LeafDescriptor, PhysicalType, Schema};

use crate::{Statistics, VERSION};

/// Everything the footer says about a file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    schema: Arc<Schema>,
    num_rows: u64,
    created_by: Option<String>,
    row_groups: Vec<RowGroupMetadata>,
}

/// One horizontal slice of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroupMetadata {
    num_rows: u64,
    file_offset: u64,
    total_byte_size: u64,
    columns: Vec<ColumnChunkMetadata>,
}

/// One leaf column's data within a row group.
///
/// Codec and encoding ids are kept as written so that files produced by other writers can be
/// described; they are only resolved when the column is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunkMetadata {
    path: ColumnPath,
    physical_type: PhysicalType,
    codec: u32,
    encoding: u32,
    file_offset: u64,
    total_compressed_size: u64,
    total_uncompressed_size: u64,
    num_values: u64,
    dictionary_page: Option<PageMetadata>,
    data_pages: Vec<PageMetadata>,
    statistics: Option<Statistics>,
}

/// Location and shape of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMetadata {
    encoding: u32,
    codec: u32,
    offset: u64,
    compressed_size: u32,
    uncompressed_size: u32,
    num_values: u32,
    num_rows: u32,
}

impl FileMetadata {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn row_groups(&self) -> &[RowGroupMetadata] {
        &self.row_groups
    }

    /// Parse and check footer metadata.
    pub fn try_from_proto(proto: pb::FileMetadata) -> StrataResult<Self> {
        if proto.version != VERSION {
            strata_bail!(
                Corrupted: "Unsupported file format version {}, expected {}",
                proto.version,
                VERSION
            );
        }
        let schema = Arc::new(Schema::from_proto(&proto.schema)?);
        let row_groups = proto
            .row_groups
            .into_iter()
            .enumerate()
            .map(|(idx, row_group)| {
                RowGroupMetadata::try_from_proto(row_group, &schema)
                    .map_err(|err| err.with_context(format!("Row group {idx}")))
            })
            .try_collect::<_, Vec<_>, _>()?;
        let total = checked_sum(row_groups.iter().map(|rg| rg.num_rows))
            .ok_or_else(|| strata_err!(Corrupted: "Row counts of the row groups overflow"))?;
        if total != proto.num_rows {
            strata_bail!(
                Corrupted: "Footer declares {} rows but its row groups hold {}",
                proto.num_rows,
                total
            );
        }
        Ok(Self {
            schema,
            num_rows: proto.num_rows,
            created_by: proto.created_by,
            row_groups,
        })
    }

    pub fn to_proto(&self) -> StrataResult<pb::FileMetadata> {
        Ok(pb::FileMetadata {
            version: VERSION,
            schema: self.schema.to_proto(),
            num_rows: self.num_rows,
            row_groups: self
                .row_groups
                .iter()
                .map(|rg| rg.to_proto(&self.schema))
                .try_collect()?,
            created_by: self.created_by.clone(),
        })
    }
}

impl RowGroupMetadata {
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Offset of the row group's first page.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Compressed size of all the row group's pages.
    pub fn total_byte_size(&self) -> u64 {
        self.total_byte_size
    }

    /// Column chunks, one per schema leaf in schema order.
    pub fn columns(&self) -> &[ColumnChunkMetadata] {
        &self.columns
    }

    fn try_from_proto(proto: pb::RowGroup, schema: &Schema) -> StrataResult<Self> {
        if proto.columns.len() != schema.leaves().len() {
            strata_bail!(
                Corrupted: "Row group has {} column chunks but the schema has {} leaves",
                proto.columns.len(),
                schema.leaves().len()
            );
        }
        let columns = proto
            .columns
            .into_iter()
            .zip(schema.leaves())
            .map(|(chunk, leaf)| ColumnChunkMetadata::try_from_proto(chunk, leaf))
            .try_collect::<_, Vec<_>, _>()?;
        for column in &columns {
            let rows = checked_sum(column.data_pages.iter().map(|p| u64::from(p.num_rows)))
                .ok_or_else(|| {
                    strata_err!(Corrupted: "Row counts of column chunk \"{}\" overflow", column.path)
                })?;
            if rows != proto.num_rows {
                strata_bail!(
                    Corrupted: "Column chunk \"{}\" holds {} rows but its row group holds {}",
                    column.path,
                    rows,
                    proto.num_rows
                );
            }
        }
        Ok(Self {
            num_rows: proto.num_rows,
            file_offset: proto.file_offset,
            total_byte_size: proto.total_byte_size,
            columns,
        })
    }

    fn to_proto(&self, schema: &Schema) -> StrataResult<pb::RowGroup> {
        Ok(pb::RowGroup {
            num_rows: self.num_rows,
            file_offset: self.file_offset,
            total_byte_size: self.total_byte_size,
            columns: self
                .columns
                .iter()
                .zip(schema.leaves())
                .map(|(chunk, leaf)| chunk.to_proto(leaf))
                .try_collect()?,
        })
    }

    pub(crate) fn new(
        num_rows: u64,
        file_offset: u64,
        total_byte_size: u64,
        columns: Vec<ColumnChunkMetadata>,
    ) -> Self {
        Self {
            num_rows,
            file_offset,
            total_byte_size,
            columns,
        }
    }
}

impl ColumnChunkMetadata {
    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// The codec recorded for the chunk. Pages carry their own codec as well.
    pub fn codec(&self) -> StrataResult<CompressionCodec> {
        codec(self.codec)
    }

    /// The value encoding of the chunk's data pages.
    pub fn encoding(&self) -> StrataResult<Encoding> {
        encoding(self.encoding)
    }

    pub fn codec_id(&self) -> u32 {
        self.codec
    }

    pub fn encoding_id(&self) -> u32 {
        self.encoding
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    pub fn total_compressed_size(&self) -> u64 {
        self.total_compressed_size
    }

    pub fn total_uncompressed_size(&self) -> u64 {
        self.total_uncompressed_size
    }

    /// Number of level entries: present values plus placeholders.
    pub fn num_values(&self) -> u64 {
        self.num_values
    }

    pub fn dictionary_page(&self) -> Option<&PageMetadata> {
        self.dictionary_page.as_ref()
    }

    pub fn data_pages(&self) -> &[PageMetadata] {
        &self.data_pages
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        path: ColumnPath,
        physical_type: PhysicalType,
        codec: CompressionCodec,
        encoding: Encoding,
        file_offset: u64,
        num_values: u64,
        dictionary_page: Option<PageMetadata>,
        data_pages: Vec<PageMetadata>,
        statistics: Option<Statistics>,
    ) -> Self {
        let pages = || dictionary_page.iter().chain(data_pages.iter());
        let total_compressed_size = pages().map(|p| u64::from(p.compressed_size)).sum();
        let total_uncompressed_size = pages().map(|p| u64::from(p.uncompressed_size)).sum();
        Self {
            path,
            physical_type,
            codec: u8::from(codec).into(),
            encoding: u8::from(encoding).into(),
            file_offset,
            total_compressed_size,
            total_uncompressed_size,
            num_values,
            dictionary_page,
            data_pages,
            statistics,
        }
    }

    fn try_from_proto(proto: pb::ColumnChunk, leaf: &LeafDescriptor) -> StrataResult<Self> {
        let path = ColumnPath::from(proto.path.as_str());
        if &path != leaf.path() {
            strata_bail!(
                Corrupted: "Column chunk \"{}\" does not match schema column \"{}\"",
                path,
                leaf.path()
            );
        }
        let physical_type = u8::try_from(proto.physical_type)
            .ok()
            .and_then(|id| PhysicalType::try_from(id).ok())
            .filter(|physical| *physical == leaf.leaf_type().physical())
            .ok_or_else(|| {
                strata_err!(
                    Corrupted: "Column chunk \"{}\" has physical type {} but the schema says {}",
                    path,
                    proto.physical_type,
                    leaf.leaf_type().physical()
                )
            })?;
        let statistics = proto
            .statistics
            .as_ref()
            .map(|stats| Statistics::from_proto(stats, leaf.leaf_type()))
            .transpose()?;
        Ok(Self {
            path,
            physical_type,
            codec: proto.codec,
            encoding: proto.encoding,
            file_offset: proto.file_offset,
            total_compressed_size: proto.total_compressed_size,
            total_uncompressed_size: proto.total_uncompressed_size,
            num_values: proto.num_values,
            dictionary_page: proto.dictionary_page.map(PageMetadata::from),
            data_pages: proto.data_pages.into_iter().map(PageMetadata::from).collect(),
            statistics,
        })
    }

    fn to_proto(&self, leaf: &LeafDescriptor) -> StrataResult<pb::ColumnChunk> {
        Ok(pb::ColumnChunk {
            path: self.path.to_string(),
            physical_type: u8::from(self.physical_type).into(),
            codec: self.codec,
            encoding: self.encoding,
            file_offset: self.file_offset,
            total_compressed_size: self.total_compressed_size,
            total_uncompressed_size: self.total_uncompressed_size,
            num_values: self.num_values,
            dictionary_page: self.dictionary_page.map(pb::PageHeader::from),
            data_pages: self.data_pages.iter().copied().map(pb::PageHeader::from).collect(),
            statistics: self
                .statistics
                .as_ref()
                .map(|stats| stats.to_proto(leaf.leaf_type()))
                .transpose()?,
        })
    }
}

impl PageMetadata {
    pub(crate) fn new(
        encoding: Encoding,
        codec: CompressionCodec,
        offset: u64,
        compressed_size: u32,
        uncompressed_size: u32,
        num_values: u32,
        num_rows: u32,
    ) -> Self {
        Self {
            encoding: u8::from(encoding).into(),
            codec: u8::from(codec).into(),
            offset,
            compressed_size,
            uncompressed_size,
            num_values,
            num_rows,
        }
    }

    pub fn encoding(&self) -> StrataResult<Encoding> {
        encoding(self.encoding)
    }

    pub fn codec(&self) -> StrataResult<CompressionCodec> {
        codec(self.codec)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn compressed_size(&self) -> u32 {
        self.compressed_size
    }

    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    /// Number of level entries in the page.
    pub fn num_values(&self) -> u32 {
        self.num_values
    }

    /// Number of rows starting in the page; zero for dictionary pages.
    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }
}

impl From<pb::PageHeader> for PageMetadata {
    fn from(header: pb::PageHeader) -> Self {
        Self {
            encoding: header.encoding,
            codec: header.codec,
            offset: header.offset,
            compressed_size: header.compressed_size,
            uncompressed_size: header.uncompressed_size,
            num_values: header.num_values,
            num_rows: header.num_rows,
        }
    }
}

impl From<PageMetadata> for pb::PageHeader {
    fn from(page: PageMetadata) -> Self {
        Self {
            encoding: page.encoding,
            codec: page.codec,
            offset: page.offset,
            compressed_size: page.compressed_size,
            uncompressed_size: page.uncompressed_size,
            num_values: page.num_values,
            num_rows: page.num_rows,
        }
    }
}

fn encoding(id: u32) -> StrataResult<Encoding> {
    u8::try_from(id)
        .ok()
        .and_then(|id| Encoding::try_from(id).ok())
        .ok_or_else(|| strata_err!(UnsupportedEncoding: "Unknown encoding id {}", id))
}

fn codec(id: u32) -> StrataResult<CompressionCodec> {
    u8::try_from(id)
        .ok()
        .and_then(|id| CompressionCodec::try_from(id).ok())
        .ok_or_else(|| strata_err!(UnsupportedCompression: "Unknown compression codec id {}", id))
}

impl FileMetadata {
    pub(crate) fn new(
        schema: Arc<Schema>,
        created_by: Option<String>,
        row_groups: Vec<RowGroupMetadata>,
    ) -> Self {
        Self {
            schema,
            num_rows: row_groups.iter().map(|rg| rg.num_rows).sum(),
            created_by,
            row_groups,
        }
    }
}

/// Sum of counts read from a footer, `None` if it does not fit in a `u64`.
fn checked_sum(counts: impl IntoIterator<Item = u64>) -> Option<u64> {
    counts.into_iter().try_fold(0u64, u64::checked_add)
}
