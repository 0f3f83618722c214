use uuid::Uuid;

/// Generate a new paste handle (a random UUIDv4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
