use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::Slot;
use crate::errors::PlantError;

/// Process-local slot. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl Slot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, PlantError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PlantError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = MemorySlot::default();
        let b = a.clone();
        a.write("k", "v").unwrap();
        assert_eq!(b.read("k").unwrap().as_deref(), Some("v"));
        assert_eq!(b.read("other").unwrap(), None);
    }
}
