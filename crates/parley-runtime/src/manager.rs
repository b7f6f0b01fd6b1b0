//! Profile manager
//!
//! The owning context for the single active session: an explicitly owned
//! value passed to whoever needs profile access, never a process-wide
//! global. `activate` enforces teardown-before-replace. Observer
//! registrations live on the manager's hub, so they survive session
//! changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use parley_core::engine::{EngineFactory, EngineOptions, NetworkEngine};
use parley_core::errors::StorageError;
use parley_core::settings::NetworkSettings;
use parley_core::store;
use parley_core::Result;

use crate::binding::{effective_settings, EngineBinding};
use crate::hub::NotificationHub;
use crate::session::ProfileSession;

/// File extension of profile saves
pub const PROFILE_EXTENSION: &str = "tox";

// ----------------------------------------------------------------------------
// Profile Manager
// ----------------------------------------------------------------------------

pub struct ProfileManager {
    profiles_dir: PathBuf,
    settings: NetworkSettings,
    factory: Box<dyn EngineFactory>,
    hub: Arc<NotificationHub>,
    active: Option<ProfileSession>,
}

impl ProfileManager {
    pub fn new(
        profiles_dir: impl Into<PathBuf>,
        settings: NetworkSettings,
        factory: Box<dyn EngineFactory>,
    ) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
            settings,
            factory,
            hub: Arc::new(NotificationHub::new()),
            active: None,
        }
    }

    /// The observer registry; registrations persist across activations.
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    /// Directory holding the profile saves
    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    /// The currently active session, if any
    pub fn active(&self) -> Option<&ProfileSession> {
        self.active.as_ref()
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.{PROFILE_EXTENSION}"))
    }

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    /// Create a new profile save: a fresh engine identity, serialized,
    /// encrypted with `password` (an empty password writes plaintext) and
    /// written to disk. Does not activate the new profile.
    pub fn create(&self, name: &str, password: &str) -> Result<()> {
        let path = self.profile_path(name);
        if path.exists() {
            warn!(path = %path.display(), "existing profile save found");
            return Err(StorageError::AlreadyExists {
                path: path.display().to_string(),
            }
            .into());
        }

        fs::create_dir_all(&self.profiles_dir).map_err(StorageError::Io)?;

        let effective = effective_settings(&self.settings);
        let engine = self.factory.create(EngineOptions {
            settings: &effective,
            save_data: None,
        })?;
        let save = engine.save_data()?;
        let blob = if password.is_empty() {
            save
        } else {
            store::encrypt(&save, password)?
        };

        write_restricted(&path, &blob).map_err(StorageError::Io)?;
        info!(profile = name, "created profile save");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------------

    /// Read a profile save from disk, decrypting it when it is flagged
    /// encrypted. Returns `None` — with a logged warning — for a missing
    /// file, an unreadable file, or a failed decryption.
    pub fn load(&self, name: &str, password: &str) -> Option<Vec<u8>> {
        let path = self.profile_path(name);
        if !path.exists() {
            warn!(path = %path.display(), "no profile save found");
            return None;
        }

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read profile save");
                return None;
            }
        };

        if store::is_encrypted(&data) {
            match store::decrypt(&data, password) {
                Ok(plaintext) => Some(plaintext),
                Err(err) => {
                    warn!(profile = name, %err, "could not decrypt profile save");
                    None
                }
            }
        } else {
            // Legacy plaintext save
            Some(data)
        }
    }

    // ------------------------------------------------------------------------
    // Activate
    // ------------------------------------------------------------------------

    /// Activate a profile, replacing any currently active session.
    ///
    /// Requesting the already-active profile is a no-op. Otherwise the old
    /// session is fully torn down (loop joined, engine released) before the
    /// new engine is constructed; on any failure no session is active
    /// afterwards and a warning is logged — the message deliberately does not
    /// distinguish a wrong password from a missing profile.
    pub fn activate(&mut self, name: &str, password: &str) {
        if self.active.as_ref().is_some_and(|session| session.name() == name) {
            debug!(profile = name, "profile already active");
            return;
        }

        self.active = None;

        let Some(save) = self.load(name, password) else {
            warn!(profile = name, "profile not activated: wrong password");
            return;
        };

        let binding = match EngineBinding::new(
            self.factory.as_ref(),
            &self.settings,
            Some(&save),
            Arc::clone(&self.hub),
        ) {
            Ok(binding) => binding,
            Err(err) => {
                warn!(profile = name, %err, "profile not activated: engine construction failed");
                return;
            }
        };

        let mut session = ProfileSession::new(name.to_string(), binding);
        session.start();
        info!(profile = name, "profile activated");
        self.active = Some(session);
    }
}

// ----------------------------------------------------------------------------
// File Helpers
// ----------------------------------------------------------------------------

/// Write a profile save with owner-only permissions where supported
fn write_restricted(path: &Path, data: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(data)
    }

    #[cfg(not(unix))]
    {
        fs::write(path, data)
    }
}
