//! Remote-debugging protocol client.
//!
//! Three layers, leaves first: `tabs` discovers inspectable targets over
//! HTTP, `session` holds one duplex connection with command/response
//! correlation, and `evaluate` runs scripts in a target and normalizes
//! in-page exceptions.

pub mod evaluate;
pub mod session;
pub mod tabs;
pub mod tool;

pub use evaluate::{evaluate, extract_page_content, PageContent, PageLink};
pub use session::ProtocolSession;
pub use tabs::{TabDirectory, TargetDescriptor};
pub use tool::DevtoolsTool;
