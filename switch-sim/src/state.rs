use parking_lot::RwLock;
use std::sync::Arc;

/// Reader/writer protected collection shared between the cycle tasks and the read endpoints.
pub type Shared<T> = Arc<RwLock<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}
