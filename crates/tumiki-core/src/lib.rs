pub mod id;
pub mod time;

pub use id::{IdError, KEY_SEPARATOR, generate_id, join_key, validate_key_part};
pub use time::{Clock, ManualClock, SharedClock, SystemClock, format_rfc3339, month_key, system_clock};
