//! Notification model, preferences, quiet hours, filtering and the
//! in-memory store.

pub mod clock;
pub mod events;
pub mod filter;
pub mod model;
pub mod preferences;
pub mod priority;
pub mod quiet_hours;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::StoreEvent;
pub use filter::{NotificationFilter, SortOrder};
pub use model::{NewNotification, Notification, NotificationKind};
pub use preferences::{NotificationPreferences, PreferencesPatch};
pub use priority::Priority;
pub use quiet_hours::QuietHours;
pub use store::{AddOutcome, NotificationStore};
