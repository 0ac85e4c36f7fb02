pub mod codec;
pub mod error;
pub mod event_id;
pub mod row;
pub mod task;

pub use codec::CodecError;
pub use error::{CallsheetError, Result};
pub use event_id::{to_event_id, EVENT_ID_PREFIX};
pub use row::{from_row, header_row, to_row, TASK_COLUMNS};
pub use task::{Attachment, AttachmentKind, Task, TaskStatus, Visibility};
