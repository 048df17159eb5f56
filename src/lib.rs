// Markbot: text watermarks for photos and videos sent through a chat bot

pub mod bot;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod session;
pub mod watermark;
