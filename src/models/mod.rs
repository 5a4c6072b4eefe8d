pub mod event;
pub mod frame;
pub mod response;

pub use event::{EventKind, FunctionCall, StreamEvent, ToolCall, ToolCallDelta, Usage};
pub use frame::RawFrame;
pub use response::{Response, StreamMetrics};
