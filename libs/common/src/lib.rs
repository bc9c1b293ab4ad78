pub mod frame;
pub mod username;

pub use frame::{ChannelType, ChatMessage, ClientFrame, FrameType, SnapshotEntry};
pub use username::random_username;
