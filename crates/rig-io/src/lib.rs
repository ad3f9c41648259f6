pub mod link;
pub mod metrics;
pub mod protocol;

pub use link::{spawn_line_reader, LinkError, SerialLink, StdioLink, TcpLink};
pub use metrics::{init_metrics, serve_metrics};
pub use protocol::{decode_record, encode_record, header_line, RecordError};
