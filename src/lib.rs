pub mod error;
pub mod codec;
pub mod header;
pub mod entry;
pub mod index;
pub mod reader;
pub mod archive;
pub mod writer;
pub mod builder;
pub mod batch;

pub use error::{ErrorKind, Result, VpError};
pub use header::{Header, HEADER_SIZE, MAGIC, VERSION};
pub use entry::{DirEntry, EntryKind, DIR_ENTRY_SIZE};
pub use index::{ArchiveIndex, IndexBuilder, PathStack};
pub use archive::VpArchive;
pub use writer::VpWriter;
pub use builder::{build, build_with_options, BuildOptions, BuildSummary};
pub use batch::{extract_dir, BatchOptions, BatchReport};
