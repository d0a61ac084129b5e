mod messages;
mod plan;
mod scheduler;

pub use messages::{assignment_message, reminder_message};
pub use plan::plan_reminders;
pub use scheduler::ReminderService;
