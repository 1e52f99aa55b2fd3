/*
 * Responsibility
 * - Preferences update DTO
 */
use serde::Deserialize;

use crate::repos::preference_repo::PreferencesPatch;

const THEMES: [&str; 3] = ["light", "dark", "system"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePreferencesRequest {
    pub email_notifications: Option<bool>,
    pub theme: Option<String>,
    pub language: Option<String>,
}

impl UpdatePreferencesRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email_notifications.is_none() && self.theme.is_none() && self.language.is_none() {
            return Err("nothing to update");
        }
        if let Some(theme) = &self.theme
            && !THEMES.contains(&theme.as_str())
        {
            return Err("theme must be one of light, dark, system");
        }
        if let Some(language) = &self.language
            && (language.len() < 2
                || language.len() > 16
                || !language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        {
            return Err("language must be a language tag such as 'en' or 'pt-BR'");
        }
        Ok(())
    }

    pub fn into_patch(self) -> PreferencesPatch {
        PreferencesPatch {
            email_notifications: self.email_notifications,
            theme: self.theme,
            language: self.language,
        }
    }
}
