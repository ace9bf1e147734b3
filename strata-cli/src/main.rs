mod json;
mod logging;
mod metadata;
mod read;

use std::path::PathBuf;

use clap::Parser;
use logging::{default_env_filter, setup_logger};
use metadata::exec_metadata;
use read::exec_read;
use strata::Reader;

#[derive(clap::Parser)]
#[command(name = "stx", version, about = "Inspect Strata files")]
struct Cli {
    /// Log everything down to trace level, unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Print the schema of a file
    Schema { file: PathBuf },
    /// Print the row groups and column chunks of a file
    Metadata { file: PathBuf },
    /// Print rows of a file as JSON lines
    Read {
        file: PathBuf,
        /// Columns to read, as top-level names or dotted paths
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(default_env_filter(cli.verbose));
    match cli.command {
        Commands::Schema { file } => {
            let file = Reader::default().read(file)?;
            println!("{}", file.schema().ddl());
        }
        Commands::Metadata { file } => exec_metadata(file)?,
        Commands::Read {
            file,
            columns,
            offset,
            limit,
        } => exec_read(file, columns, offset, limit)?,
    }
    Ok(())
}
