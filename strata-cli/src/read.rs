use std::io::{BufWriter, Write};
use std::path::Path;

use strata::Reader;
use tracing::debug;

use crate::json::row_to_json;

pub fn exec_read(
    file: impl AsRef<Path>,
    columns: Vec<String>,
    offset: i64,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let file = Reader::default().read(file)?;
    let mut scan = file.scan().with_columns(columns).with_offset(offset);
    if let Some(limit) = limit {
        scan = scan.with_limit(limit);
    }
    let rows = scan.into_rows()?;

    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut count = 0usize;
    for row in rows {
        serde_json::to_writer(&mut out, &row_to_json(file.schema(), &row?))?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;
    debug!("Printed {count} rows");
    Ok(())
}
