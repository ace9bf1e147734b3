//! Footer messages, serialized once at the end of every file.

/// Top-level file metadata.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FileMetadata {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// The schema tree flattened depth-first; group elements record how many of the following
    /// elements are their direct children.
    #[prost(message, repeated, tag = "2")]
    pub schema: Vec<SchemaElement>,
    #[prost(uint64, tag = "3")]
    pub num_rows: u64,
    #[prost(message, repeated, tag = "4")]
    pub row_groups: Vec<RowGroup>,
    #[prost(string, optional, tag = "5")]
    pub created_by: Option<String>,
}

/// A single node of the schema tree.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SchemaElement {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub repetition: u32,
    /// Set for leaf columns only.
    #[prost(uint32, optional, tag = "3")]
    pub physical_type: Option<u32>,
    /// Byte width of fixed-length byte arrays.
    #[prost(uint32, optional, tag = "4")]
    pub type_length: Option<u32>,
    #[prost(message, optional, tag = "5")]
    pub logical_type: Option<LogicalType>,
    /// Set for group columns only.
    #[prost(uint32, optional, tag = "6")]
    pub group_shape: Option<u32>,
    #[prost(uint32, tag = "7")]
    pub num_children: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogicalType {
    #[prost(uint32, tag = "1")]
    pub kind: u32,
    #[prost(uint32, optional, tag = "2")]
    pub precision: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub scale: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub time_unit: Option<u32>,
    #[prost(bool, tag = "5")]
    pub is_adjusted_to_utc: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowGroup {
    #[prost(uint64, tag = "1")]
    pub num_rows: u64,
    #[prost(uint64, tag = "2")]
    pub file_offset: u64,
    #[prost(uint64, tag = "3")]
    pub total_byte_size: u64,
    #[prost(message, repeated, tag = "4")]
    pub columns: Vec<ColumnChunk>,
}

/// One leaf column's data within one row group.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ColumnChunk {
    /// Dotted path of the leaf column.
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(uint32, tag = "2")]
    pub physical_type: u32,
    #[prost(uint32, tag = "3")]
    pub codec: u32,
    #[prost(uint32, tag = "4")]
    pub encoding: u32,
    #[prost(uint64, tag = "5")]
    pub file_offset: u64,
    #[prost(uint64, tag = "6")]
    pub total_compressed_size: u64,
    #[prost(uint64, tag = "7")]
    pub total_uncompressed_size: u64,
    /// Number of level entries (present values plus placeholders).
    #[prost(uint64, tag = "8")]
    pub num_values: u64,
    #[prost(message, optional, tag = "9")]
    pub dictionary_page: Option<PageHeader>,
    #[prost(message, repeated, tag = "10")]
    pub data_pages: Vec<PageHeader>,
    #[prost(message, optional, tag = "11")]
    pub statistics: Option<Statistics>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PageHeader {
    #[prost(uint32, tag = "1")]
    pub encoding: u32,
    #[prost(uint32, tag = "2")]
    pub codec: u32,
    #[prost(uint64, tag = "3")]
    pub offset: u64,
    #[prost(uint32, tag = "4")]
    pub compressed_size: u32,
    #[prost(uint32, tag = "5")]
    pub uncompressed_size: u32,
    #[prost(uint32, tag = "6")]
    pub num_values: u32,
    #[prost(uint32, tag = "7")]
    pub num_rows: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Statistics {
    #[prost(uint64, tag = "1")]
    pub null_count: u64,
    #[prost(uint64, optional, tag = "2")]
    pub distinct_count: Option<u64>,
    /// PLAIN encoding of the smallest present value.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub min: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub max: Option<Vec<u8>>,
}
