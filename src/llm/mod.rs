pub mod assistant;
pub mod lyrics;
pub mod provider;
pub mod session;

pub use assistant::{find_hymn_lyrics, Assistant, HymnLookup, Suggestion, Suggestions, APOLOGY};
pub use lyrics::{split_lyrics, LyricsSplit};
pub use provider::{create_provider, ChatRequest, LlmError, LlmProvider, LlmResult, ModelReply, ToolCall, ToolSpec, Turn};
pub use session::{ChatSession, PendingReply, RequestToken};
