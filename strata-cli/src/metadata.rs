use std::fmt::Write as _;
use std::path::Path;

use humansize::{DECIMAL, format_size};
use strata::error::StrataResult;
use strata::{ColumnChunkMetadata, FileMetadata, Reader};

pub fn exec_metadata(file: impl AsRef<Path>) -> StrataResult<()> {
    let file = Reader::default().read(file)?;
    print!("{}", describe(file.metadata()));
    Ok(())
}

pub(crate) fn describe(metadata: &FileMetadata) -> String {
    let mut out = String::new();
    if let Some(created_by) = metadata.created_by() {
        let _ = writeln!(out, "Created by: {created_by}");
    }
    let _ = writeln!(
        out,
        "Rows: {}, row groups: {}",
        metadata.num_rows(),
        metadata.row_groups().len()
    );
    for (idx, row_group) in metadata.row_groups().iter().enumerate() {
        let _ = writeln!(
            out,
            "Row group {idx}: {} rows at offset {}, {}",
            row_group.num_rows(),
            row_group.file_offset(),
            format_size(row_group.total_byte_size(), DECIMAL)
        );
        for chunk in row_group.columns() {
            describe_chunk(&mut out, chunk);
        }
    }
    out
}

fn describe_chunk(out: &mut String, chunk: &ColumnChunkMetadata) {
    let encoding = chunk
        .encoding()
        .map_or_else(|_| format!("unknown ({})", chunk.encoding_id()), |e| e.to_string());
    let codec = chunk
        .codec()
        .map_or_else(|_| format!("unknown ({})", chunk.codec_id()), |c| c.to_string());
    let _ = writeln!(
        out,
        "  {} {}: {} values, {} {}, {} compressed, {} uncompressed, {} pages{}",
        chunk.path(),
        chunk.physical_type(),
        chunk.num_values(),
        encoding,
        codec,
        format_size(chunk.total_compressed_size(), DECIMAL),
        format_size(chunk.total_uncompressed_size(), DECIMAL),
        chunk.data_pages().len(),
        if chunk.dictionary_page().is_some() {
            " + dictionary"
        } else {
            ""
        }
    );
    if let Some(stats) = chunk.statistics() {
        let _ = write!(out, "    nulls: {}", stats.null_count());
        if let Some(distinct) = stats.distinct_count() {
            let _ = write!(out, ", distinct: {distinct}");
        }
        if let (Some(min), Some(max)) = (stats.min(), stats.max()) {
            let _ = write!(out, ", min: {min}, max: {max}");
        }
        out.push('\n');
    }
}
