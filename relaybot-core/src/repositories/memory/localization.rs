use std::collections::HashMap;
use dashmap::DashMap;
use tracing::warn;
use relaybot_common::models::{Platform, DEFAULT_LANGUAGE};
use relaybot_common::traits::Localizer;

use crate::services::system_strings;

/// Templates held in memory, with optional per-channel overrides.
///
/// Lookup order: channel override, requested language, default language, the key itself.
/// `{name}` placeholders are replaced from the substitution list.
pub struct StaticLocalizer {
    default_language: String,
    strings: HashMap<(String, String), String>,
    channel_overrides: DashMap<(Platform, String, String), String>,
}

impl StaticLocalizer {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
            strings: HashMap::new(),
            channel_overrides: DashMap::new(),
        }
    }

    /// Preloaded with the dispatcher's system messages.
    pub fn with_system_strings(default_language: &str) -> Self {
        let mut me = Self::new(default_language);
        for (lang, key, template) in system_strings::DEFAULTS {
            me.insert(lang, key, template);
        }
        me
    }

    pub fn insert(&mut self, language: &str, key: &str, template: &str) {
        self.strings
            .insert((language.to_lowercase(), key.to_string()), template.to_string());
    }

    pub fn set_channel_override(&self, platform: Platform, channel_id: &str, key: &str, template: &str) {
        self.channel_overrides
            .insert((platform, channel_id.to_string(), key.to_string()), template.to_string());
    }

    fn template(&self, language: &str, key: &str, channel_id: &str, platform: Platform) -> Option<String> {
        if let Some(t) = self
            .channel_overrides
            .get(&(platform, channel_id.to_string(), key.to_string()))
        {
            return Some(t.value().clone());
        }
        self.strings
            .get(&(language.to_lowercase(), key.to_string()))
            .or_else(|| self.strings.get(&(self.default_language.clone(), key.to_string())))
            .cloned()
    }
}

impl Default for StaticLocalizer {
    fn default() -> Self {
        Self::with_system_strings(DEFAULT_LANGUAGE)
    }
}

fn substitute(template: &str, substitutions: &[(String, String)]) -> String {
    substitutions
        .iter()
        .fold(template.to_string(), |acc, (name, value)| acc.replace(&format!("{{{}}}", name), value))
}

impl Localizer for StaticLocalizer {
    fn get_string(
        &self,
        language: &str,
        key: &str,
        channel_id: &str,
        platform: Platform,
        substitutions: &[(String, String)],
    ) -> String {
        match self.template(language, key, channel_id, platform) {
            Some(t) => substitute(&t, substitutions),
            None => {
                warn!("No localized string for key '{}' (language '{}')", key, language);
                key.to_string()
            }
        }
    }
}
