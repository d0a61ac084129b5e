mod event_date;
mod event_slug;
mod trimmed_string;

pub use event_date::EventDate;
pub use event_slug::EventSlug;
pub use trimmed_string::TrimmedString;
