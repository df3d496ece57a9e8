use anyhow::{Result, anyhow};
use keyring::Entry;

const APP_NAME: &str = "tagmail";
const SESSION_KEY: &str = "server_session";

/// Keeps the inbox service's session cookie in the OS keyring, so a restart
/// resumes the same server-side session.
pub struct RingStorage;

impl RingStorage {
    fn entry() -> Result<Entry> {
        Entry::new(APP_NAME, SESSION_KEY).map_err(|e| anyhow!("Keyring error: {}", e))
    }

    pub fn load(&self) -> Result<Option<String>> {
        match Self::entry()?.get_password() {
            Ok(cookie) if cookie.trim().is_empty() => Ok(None),
            Ok(cookie) => Ok(Some(cookie)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!("Keyring error: {}", e)),
        }
    }

    pub fn store(&self, cookie: &str) -> Result<()> {
        Self::entry()?
            .set_password(cookie)
            .map_err(|e| anyhow!("Keyring error: {}", e))
    }

    pub fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow!("Keyring error: {}", e)),
        }
    }
}
