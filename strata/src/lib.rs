pub use strata_file::*;
pub use {
    strata_compress as compress, strata_dremel as dremel, strata_encoding as encoding,
    strata_error as error, strata_io as io, strata_proto as proto, strata_scalar as scalar,
    strata_schema as schema,
};
