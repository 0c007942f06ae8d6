mod bus;
mod handlers;
mod types;

pub use bus::{EventBus, EventReceiver, DEFAULT_EVENT_CAPACITY};
pub use handlers::{LoggingEventHandler, UPLOAD_LOG_COMPONENT};
pub use types::{EventSequence, UploadEvent, UploadEventPayload};
