use chrono::Local;
use uuid::Uuid;

/// Opaque document id: creation date followed by a short random suffix.
pub fn generate_id() -> String {
    format!(
        "{}_{}",
        Local::now().format("%Y%m%d"),
        &Uuid::new_v4().simple().to_string()[..8]
    )
}
