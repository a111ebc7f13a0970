//! Slack event intake: typed callbacks, Web API access, and the handlers
//! that keep each workspace's index current.

pub mod client;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod replies;
pub mod tasks;

pub use client::{ChannelInfo, FileInfo, HttpSlackClient, SlackApi, SlackApiError};
pub use dispatch::{EventDispatcher, EventHandler, EventHandlerError};
pub use events::{AppMentionEvent, EventCallback, EventParseError, SlackEvent, SlackEventType};
pub use tasks::TaskGroup;
