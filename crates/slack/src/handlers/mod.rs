//! Event handlers that keep the index in step with the workspace.

mod app_uninstalled;
mod channel_deleted;
mod file_deleted;
mod file_shared;
mod message;

pub use app_uninstalled::AppUninstalledHandler;
pub use channel_deleted::ChannelDeletedHandler;
pub use file_deleted::FileDeletedHandler;
pub use file_shared::FileSharedHandler;
pub use message::MessageHandler;
