pub mod compression;
pub mod error;
pub mod hooks;
pub mod packet;
pub mod packetizer;
pub mod reader;
pub mod session;
pub mod timecode_factory;
pub mod track;

pub use error::{MuxError, Result};
pub use packet::Packet;
pub use packetizer::Packetizer;
pub use reader::Reader;
pub use session::MuxSession;
