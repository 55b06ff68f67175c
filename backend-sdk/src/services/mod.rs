//! Upstream service clients

pub mod common;
pub mod local;
pub mod remote;
pub mod search;

pub use local::{LocalChatClient, LocalChatClientBuilder};
pub use remote::{RemoteChatClient, RemoteChatClientBuilder};
pub use search::{SearchTool, ToolSearchClient, ToolSearchClientBuilder};
