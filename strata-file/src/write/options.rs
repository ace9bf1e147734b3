use strata_compress::{CompressionCodec, DEFAULT_GZIP_LEVEL};
use strata_error::{StrataResult, strata_bail};

/// Default byte size above which a row group is flushed.
pub const DEFAULT_ROW_GROUP_SIZE_BYTES: usize = 8 * 1024 * 1024;
/// Default number of rows between two row group size checks.
pub const DEFAULT_ROW_GROUP_SIZE_CHECK_INTERVAL: usize = 1000;
/// Default byte size above which a data page is cut.
pub const DEFAULT_PAGE_SIZE_BYTES: usize = 1024 * 1024;
/// Default maximum size of a dictionary page.
pub const DEFAULT_DICTIONARY_PAGE_SIZE_BYTES: usize = 1024 * 1024;
/// Default maximum ratio of distinct to total values for a dictionary encoded column chunk.
pub const DEFAULT_DICTIONARY_MIN_CARDINALITY_RATIO: f64 = 0.4;

/// Settings for one write session.
///
/// Sizes are estimates taken from uncompressed PLAIN value sizes plus level bytes. The row
/// group size is checked every [`row_group_size_check_interval`](Self::row_group_size_check_interval)
/// rows, so a row group may overshoot it by up to one interval's worth of rows.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    compression: CompressionCodec,
    gzip_level: u32,
    row_group_size_bytes: usize,
    row_group_size_check_interval: usize,
    page_size_bytes: usize,
    dictionary_page_size_bytes: usize,
    dictionary_min_cardinality_ratio: f64,
    validation: bool,
    created_by: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: CompressionCodec::default(),
            gzip_level: DEFAULT_GZIP_LEVEL,
            row_group_size_bytes: DEFAULT_ROW_GROUP_SIZE_BYTES,
            row_group_size_check_interval: DEFAULT_ROW_GROUP_SIZE_CHECK_INTERVAL,
            page_size_bytes: DEFAULT_PAGE_SIZE_BYTES,
            dictionary_page_size_bytes: DEFAULT_DICTIONARY_PAGE_SIZE_BYTES,
            dictionary_min_cardinality_ratio: DEFAULT_DICTIONARY_MIN_CARDINALITY_RATIO,
            validation: true,
            created_by: Some(format!("strata version {}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl WriteOptions {
    /// Compress every page with `codec`.
    pub fn with_compression(mut self, codec: CompressionCodec) -> Self {
        self.compression = codec;
        self
    }

    /// Level used when the codec is gzip, between 0 and 9.
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level;
        self
    }

    pub fn with_row_group_size_bytes(mut self, bytes: usize) -> Self {
        self.row_group_size_bytes = bytes;
        self
    }

    /// Check the buffered row group size every `rows` rows.
    ///
    /// Smaller intervals keep row groups closer to their target size at the cost of more
    /// frequent estimates.
    pub fn with_row_group_size_check_interval(mut self, rows: usize) -> Self {
        self.row_group_size_check_interval = rows;
        self
    }

    pub fn with_page_size_bytes(mut self, bytes: usize) -> Self {
        self.page_size_bytes = bytes;
        self
    }

    pub fn with_dictionary_page_size_bytes(mut self, bytes: usize) -> Self {
        self.dictionary_page_size_bytes = bytes;
        self
    }

    /// Dictionary encode a column chunk only when it has at most `ratio` distinct values per
    /// value.
    pub fn with_dictionary_min_cardinality_ratio(mut self, ratio: f64) -> Self {
        self.dictionary_min_cardinality_ratio = ratio;
        self
    }

    /// Whether rows are checked against the schema before they are buffered.
    ///
    /// Without validation a mismatched value still fails, but only once it reaches the
    /// encoder, and the error does not name the column.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_created_by<S: Into<String>>(mut self, created_by: Option<S>) -> Self {
        self.created_by = created_by.map(Into::into);
        self
    }

    pub fn compression(&self) -> CompressionCodec {
        self.compression
    }

    pub fn gzip_level(&self) -> u32 {
        self.gzip_level
    }

    pub fn row_group_size_bytes(&self) -> usize {
        self.row_group_size_bytes
    }

    pub fn row_group_size_check_interval(&self) -> usize {
        self.row_group_size_check_interval
    }

    pub fn page_size_bytes(&self) -> usize {
        self.page_size_bytes
    }

    pub fn dictionary_page_size_bytes(&self) -> usize {
        self.dictionary_page_size_bytes
    }

    pub fn dictionary_min_cardinality_ratio(&self) -> f64 {
        self.dictionary_min_cardinality_ratio
    }

    pub fn validation(&self) -> bool {
        self.validation
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub(crate) fn validate(&self) -> StrataResult<()> {
        if self.row_group_size_bytes == 0 {
            strata_bail!("Row group size must be greater than 0");
        }
        if self.row_group_size_check_interval == 0 {
            strata_bail!("Row group size check interval must be greater than 0");
        }
        if self.page_size_bytes == 0 {
            strata_bail!("Page size must be greater than 0");
        }
        if self.dictionary_page_size_bytes == 0 {
            strata_bail!("Dictionary page size must be greater than 0");
        }
        let ratio = self.dictionary_min_cardinality_ratio;
        let in_range = ratio > 0.0 && ratio <= 1.0;
        if !in_range {
            strata_bail!("Dictionary cardinality ratio must be in (0, 1], got {}", ratio);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = WriteOptions::default();
        options.validate().unwrap();
        assert_eq!(options.compression(), CompressionCodec::Uncompressed);
        assert_eq!(options.row_group_size_check_interval(), 1000);
        assert!(options.created_by().unwrap().starts_with("strata version"));
    }

    #[rstest]
    #[case(WriteOptions::default().with_row_group_size_bytes(0))]
    #[case(WriteOptions::default().with_row_group_size_check_interval(0))]
    #[case(WriteOptions::default().with_page_size_bytes(0))]
    #[case(WriteOptions::default().with_dictionary_page_size_bytes(0))]
    #[case(WriteOptions::default().with_dictionary_min_cardinality_ratio(0.0))]
    #[case(WriteOptions::default().with_dictionary_min_cardinality_ratio(1.5))]
    #[case(WriteOptions::default().with_dictionary_min_cardinality_ratio(f64::NAN))]
    fn invalid_settings(#[case] options: WriteOptions) {
        assert!(options.validate().is_err());
    }
}
