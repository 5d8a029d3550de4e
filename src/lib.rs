pub mod record;
pub mod metadata;
pub mod value;
pub mod serialize;
pub mod error;
pub mod endpoint;
pub mod sink;
pub mod agent;
pub mod logger;
pub mod flusher;
pub mod layer;

#[cfg(feature = "http")]
pub mod http;

pub mod init;
pub mod env;

pub use agent::{Agent, AgentConfig};
pub use logger::{Console, Logger};
pub use error::{AgentError, SinkError};
pub use metadata::{MetaValue, MetadataInit};
pub use record::{FlushPayload, LogEntry, LogLevel, Metadata};
pub use value::Value;
