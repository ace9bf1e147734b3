use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use strata_error::{StrataError, StrataResult, strata_bail, strata_err};
use strata_io::ReadAt;
use strata_proto::footer as pb;
use strata_schema::Schema;

use crate::{EOF_SIZE, FileMetadata, MAGIC_BYTES, RowIterator, ScanBuilder};

/// Opens Strata files.
///
/// Opening reads and checks the footer; no page is read until rows are requested.
#[derive(Debug, Clone, Default)]
pub struct Reader {
    file_size: Option<u64>,
}

impl Reader {
    /// Configure a known file size, saving the request that would discover it.
    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = Some(file_size);
        self
    }

    /// Open the file at `path`.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> StrataResult<StrataFile<File>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            StrataError::from(err).with_context(format!("Failed to open {}", path.display()))
        })?;
        self.open(file)
    }

    /// Open a file held in memory.
    pub fn read_bytes<B: Into<Bytes>>(&self, bytes: B) -> StrataResult<StrataFile<Bytes>> {
        self.open(bytes.into())
    }

    /// Open a file from any positional reader.
    pub fn open<R: ReadAt>(&self, read: R) -> StrataResult<StrataFile<R>> {
        let file_size = match self.file_size {
            Some(file_size) => file_size,
            None => read.size()?,
        };
        let metadata = read_footer(&read, file_size)?;
        Ok(StrataFile {
            read: Arc::new(read),
            metadata: Arc::new(metadata),
        })
    }
}

/// Locate, decode and check the footer, which ends `EOF_SIZE` bytes before the end of the file.
fn read_footer<R: ReadAt>(read: &R, file_size: u64) -> StrataResult<FileMetadata> {
    let magic_len = MAGIC_BYTES.len() as u64;
    let eof_size = EOF_SIZE as u64;
    if file_size < magic_len + eof_size {
        strata_bail!(
            Corrupted: "File of {} bytes is too small to be a Strata file",
            file_size
        );
    }

    let head = read.read_byte_range(0..magic_len)?;
    if head != MAGIC_BYTES[..] {
        strata_bail!(Corrupted: "Malformed file, invalid leading magic bytes, got {:?}", head);
    }
    let eof = read.read_byte_range(file_size - eof_size..file_size)?;
    let (footer_len, magic) = eof.split_at(EOF_SIZE - MAGIC_BYTES.len());
    if magic != MAGIC_BYTES {
        strata_bail!(Corrupted: "Malformed file, invalid trailing magic bytes, got {:?}", magic);
    }
    let footer_len = u32::from_le_bytes(
        footer_len
            .try_into()
            .map_err(|err| strata_err!(Corrupted: "Footer length was not a u32 {}", err))?,
    );
    let footer_end = file_size - eof_size;
    let footer_len = u64::from(footer_len);
    if footer_len > footer_end - magic_len {
        strata_bail!(
            Corrupted: "Footer length {} points outside the file of {} bytes",
            footer_len,
            file_size
        );
    }

    let footer = read.read_byte_range(footer_end - footer_len..footer_end)?;
    let proto = pb::FileMetadata::decode(footer)
        .map_err(|err| StrataError::from(err).with_context("Malformed footer"))?;
    FileMetadata::try_from_proto(proto)
}

/// An open Strata file.
pub struct StrataFile<R> {
    read: Arc<R>,
    metadata: Arc<FileMetadata>,
}

impl<R> Clone for StrataFile<R> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<R: ReadAt> StrataFile<R> {
    pub fn metadata(&self) -> &Arc<FileMetadata> {
        &self.metadata
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.metadata.schema()
    }

    pub fn num_rows(&self) -> u64 {
        self.metadata.num_rows()
    }

    /// Start configuring a read of the file's rows.
    pub fn scan(&self) -> ScanBuilder<R> {
        ScanBuilder::new(self.read.clone(), self.metadata.clone())
    }

    /// Every row of the file, with every column.
    pub fn values(&self) -> StrataResult<RowIterator<R>> {
        self.scan().into_rows()
    }
}
