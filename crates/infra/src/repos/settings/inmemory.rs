use super::ISettingsRepo;
use std::{collections::HashMap, sync::Mutex};

pub struct InMemorySettingsRepo {
    settings: Mutex<HashMap<String, String>>,
}

impl InMemorySettingsRepo {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl ISettingsRepo for InMemorySettingsRepo {
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut settings = self.settings.lock().unwrap();
        settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let settings = self.settings.lock().unwrap();
        Ok(settings.get(key).cloned())
    }
}
