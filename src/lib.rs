pub mod config;
pub mod differ;
pub mod highlight;
pub mod lifecycle;
pub mod logging;
pub mod page;
pub mod registry;
pub mod render;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod source;
