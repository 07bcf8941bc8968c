//! Language-model clients.

mod http;

pub use http::{parse_sse_line, HttpChatModel, SseLine};
