use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

/// Maps frontend session ids to upstream account ids.
///
/// Filled from the OAuth `state` parameter during the callback so the
/// frontend can keep using its own id while credentials stay keyed by the
/// upstream account.
#[derive(Default)]
pub struct UserIdMapping {
    ids: Mutex<HashMap<String, String>>,
}

impl UserIdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_user_ids(&self, frontend_id: &str, upstream_id: &str) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(frontend_id.to_string(), upstream_id.to_string());
    }

    pub fn upstream_id(&self, frontend_id: &str) -> Option<String> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(frontend_id)
            .cloned()
    }

    /// Returns the mapped upstream id, or the given id when none is mapped.
    pub fn resolve(&self, id: &str) -> String {
        self.upstream_id(id).unwrap_or_else(|| id.to_string())
    }

    pub fn clear(&self) {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
