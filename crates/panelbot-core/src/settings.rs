//! Bot settings surface.
//!
//! The panel owns persistent settings storage; the bot only reads current
//! values. Every accessor re-reads its backing store so edits take effect
//! without restarting the process (the admin list in particular is checked
//! on every single update).

use std::{env, fs, path::Path};

/// Read-only view of the bot's configuration.
pub trait SettingsPort: Send + Sync {
    fn bot_enabled(&self) -> bool;
    fn bot_token(&self) -> String;
    /// Comma-separated admin chat ids; malformed entries are the parser's
    /// problem, not the store's.
    fn admin_chat_ids(&self) -> String;
    /// Six-field cron expression for the daily report; empty means default.
    fn report_schedule(&self) -> String;
}

/// Settings backed by process environment variables (`TGBOT_*`), with `.env`
/// loading at construction. Reads go straight to `env::var` on every call.
pub struct EnvSettings;

impl EnvSettings {
    pub fn load() -> Self {
        load_dotenv_if_present(Path::new(".env"));
        Self
    }
}

impl SettingsPort for EnvSettings {
    fn bot_enabled(&self) -> bool {
        env_bool("TGBOT_ENABLE").unwrap_or(false)
    }

    fn bot_token(&self) -> String {
        env_str("TGBOT_TOKEN").unwrap_or_default()
    }

    fn admin_chat_ids(&self) -> String {
        env_str("TGBOT_CHAT_ID").unwrap_or_default()
    }

    fn report_schedule(&self) -> String {
        env_str("TGBOT_RUNTIME").unwrap_or_default()
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_bool_accepts_common_truthy_spellings() {
        env::set_var("PANELBOT_TEST_BOOL", "Yes");
        assert_eq!(env_bool("PANELBOT_TEST_BOOL"), Some(true));
        env::set_var("PANELBOT_TEST_BOOL", "0");
        assert_eq!(env_bool("PANELBOT_TEST_BOOL"), Some(false));
        env::remove_var("PANELBOT_TEST_BOOL");
        assert_eq!(env_bool("PANELBOT_TEST_BOOL"), None);
    }

    #[test]
    fn dotenv_loads_without_overriding_existing() {
        let path = std::path::PathBuf::from(format!("/tmp/panelbot-env-{}", std::process::id()));
        fs::write(
            &path,
            "PANELBOT_TEST_A=\"quoted\"\nPANELBOT_TEST_B=plain\n# comment\n",
        )
        .unwrap();

        env::set_var("PANELBOT_TEST_B", "preset");
        load_dotenv_if_present(&path);

        assert_eq!(env::var("PANELBOT_TEST_A").unwrap(), "quoted");
        assert_eq!(env::var("PANELBOT_TEST_B").unwrap(), "preset");

        env::remove_var("PANELBOT_TEST_A");
        env::remove_var("PANELBOT_TEST_B");
        let _ = fs::remove_file(&path);
    }
}
