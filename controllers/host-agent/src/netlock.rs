//! Network-config lock.
//!
//! A file-scoped advisory lock shared with the platform's own network
//! configuration tooling. Acquisition retries a bounded number of times with
//! a fixed backoff, then proceeds without the lock. The lock is released
//! when the guard drops.

use crate::config::LockConfig;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Advisory lock on the network configuration file.
#[derive(Debug)]
pub struct NetworkLock {
    path: PathBuf,
    file: Option<File>,
}

impl NetworkLock {
    /// Acquire the lock, or return an unheld guard after the last attempt.
    pub async fn acquire(config: &LockConfig) -> Self {
        let path = config.path.clone();
        let backoff = Duration::from_millis(config.backoff_ms);

        for attempt in 1..=config.attempts {
            match try_lock(&config.path) {
                Ok(file) => {
                    debug!("acquired {} on attempt {}", path.display(), attempt);
                    return Self {
                        path,
                        file: Some(file),
                    };
                }
                Err(reason) => {
                    warn!(
                        "{} busy ({}), attempt {}/{}",
                        path.display(),
                        reason,
                        attempt,
                        config.attempts
                    );
                    if attempt < config.attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        error!(
            "could not acquire {} after {} attempts, continuing without it",
            path.display(),
            config.attempts
        );
        Self { path, file: None }
    }

    /// Whether the lock file is open and locked.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for NetworkLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.unlock() {
                warn!("failed to release {}: {}", self.path.display(), e);
            } else {
                debug!("released {}", self.path.display());
            }
        }
    }
}

fn try_lock(path: &std::path::Path) -> Result<File, String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| e.to_string())?;
    match file.try_lock() {
        Ok(()) => Ok(file),
        Err(TryLockError::WouldBlock) => Err("held elsewhere".to_string()),
        Err(TryLockError::Error(e)) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &tempfile::TempDir) -> LockConfig {
        LockConfig {
            path: dir.path().join("run/network-config.lock"),
            attempts: 3,
            backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_acquire_and_release_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        {
            let lock = NetworkLock::acquire(&config).await;
            assert!(lock.is_held());
            let other = File::open(&config.path).unwrap();
            assert!(matches!(other.try_lock(), Err(TryLockError::WouldBlock)));
        }
        let other = File::open(&config.path).unwrap();
        assert!(other.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_fails_open_when_held_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        std::fs::create_dir_all(config.path.parent().unwrap()).unwrap();
        let holder = File::create(&config.path).unwrap();
        holder.lock().unwrap();

        let lock = NetworkLock::acquire(&config).await;
        assert!(!lock.is_held());

        holder.unlock().unwrap();
        let lock = NetworkLock::acquire(&config).await;
        assert!(lock.is_held());
    }
}
