pub mod accumulator;
pub mod aggregate;
pub mod decoder;
pub mod guard;
pub mod normalizer;
pub mod stream;
pub mod timeout;

pub use accumulator::{DeltaAccumulator, ToolInputBuffer};
pub use aggregate::ResponseBuilder;
pub use decoder::FrameDecoder;
pub use guard::validate_content_type;
pub use normalizer::EventNormalizer;
pub use stream::{ByteStream, EventStream};
pub use timeout::{Deadline, TimeoutSupervisor};
