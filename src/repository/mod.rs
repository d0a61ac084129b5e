mod assignment_repository;
mod conversion;
mod event_repository;
mod exclusion_repository;
mod member_repository;
mod reminder_repository;

pub use assignment_repository::AssignmentRepository;
pub use event_repository::EventRepository;
pub use exclusion_repository::ExclusionRepository;
pub use member_repository::MemberRepository;
pub use reminder_repository::{ReminderRepository, ReminderStorageEvent};

#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("In-memory database should open");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Migrations should apply");

    pool
}
