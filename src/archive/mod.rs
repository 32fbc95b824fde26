mod handle;
mod reader;
mod registry;
mod stream;

pub use handle::{ArchiveHandle, ArchiveIdentity};
pub use reader::ArchiveReader;
pub use registry::HandleRegistry;
pub use stream::EntryStream;
