//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`SecretStore`] for the AquaMon node.
//!
//! # Security
//!
//! - Config validation: every field is range-checked before persistence.
//! - Secrets (API key, bearer token) live in their own namespace and are
//!   never logged; only their length is.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, SecretStore, StorageError};
use crate::config::SystemConfig;
use crate::telemetry::uploader::{API_KEY_SECRET, BEARER_TOKEN_SECRET};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "aquamon";
const CONFIG_KEY: &str = "syscfg";
const SECRET_NAMESPACE: &str = "secrets";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

/// Secrets baked in at build time, provisioned on first boot.
const BUILD_SECRETS: [(&str, Option<&str>); 2] = [
    (API_KEY_SECRET, option_env!("COLLECTOR_API_KEY")),
    (BEARER_TOKEN_SECRET, option_env!("COLLECTOR_TOKEN")),
];

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Use the default NVS partition.
    ///
    /// Taking the partition initialises flash (erasing it after a layout
    /// version change), so the handle is required as proof.
    #[cfg(target_os = "espidf")]
    pub fn new(_partition: &esp_idf_svc::nvs::EspDefaultNvsPartition) -> Self {
        info!("NvsAdapter: ESP-IDF NVS ready");
        Self {}
    }

    /// In-memory backend for host tests.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// NUL-terminated copy of an NVS name (max 15 bytes).
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns_buf = Self::c_name(namespace);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(namespace: &str, key: &str) -> Result<Vec<u8>, i32> {
        Self::with_nvs_handle(namespace, false, |handle| {
            let key_buf = Self::c_name(key);
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        })
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(namespace: &str, key: &str, data: &[u8]) -> Result<(), i32> {
        Self::with_nvs_handle(namespace, true, |handle| {
            let key_buf = Self::c_name(key);
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        match Self::read_blob(namespace, key) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
            Err(e) => {
                warn!("NvsAdapter: read {}/{} failed ({})", namespace, key, e);
                Err(StorageError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.store
            .borrow()
            .get(&Self::composite_key(namespace, key))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    #[cfg(target_os = "espidf")]
    fn write_raw(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        Self::write_blob(namespace, key, data).map_err(|e| {
            warn!("NvsAdapter: write {}/{} failed ({})", namespace, key, e);
            StorageError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_raw(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    /// Store any build-time secret that is not yet in NVS.  Returns how
    /// many were written.
    pub fn provision_build_secrets(&mut self) -> usize {
        self.provision(&BUILD_SECRETS)
    }

    fn provision(&mut self, secrets: &[(&str, Option<&str>)]) -> usize {
        let mut written = 0;
        for &(key, value) in secrets {
            let Some(value) = value else { continue };
            match self.read_raw(SECRET_NAMESPACE, key) {
                Err(StorageError::NotFound) => {}
                _ => continue,
            }
            match self.store_secret(key, value.as_bytes()) {
                Ok(()) => {
                    info!("NvsAdapter: provisioned '{}' ({} bytes)", key, value.len());
                    written += 1;
                }
                Err(e) => warn!("NvsAdapter: provisioning '{}' failed ({})", key, e),
            }
        }
        written
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── ConfigPort ─────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let bytes = match self.read_raw(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({}), using defaults", e);
                return Ok(SystemConfig::default());
            }
        };

        let cfg = match postcard::from_bytes::<SystemConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(_) => {
                warn!("NvsAdapter: stored config corrupted, using defaults");
                return Ok(SystemConfig::default());
            }
        };
        if let Err(e) = cfg.validate() {
            warn!("NvsAdapter: stored config rejected ({}), using defaults", e);
            return Ok(SystemConfig::default());
        }
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_raw(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

// ── SecretStore ────────────────────────────────────────────────

impl SecretStore for NvsAdapter {
    fn load_secret(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.read_raw(SECRET_NAMESPACE, key)?;
        let dst = buf.get_mut(..data.len()).ok_or(StorageError::TooLarge)?;
        dst.copy_from_slice(&data);
        Ok(data.len())
    }

    fn store_secret(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.write_raw(SECRET_NAMESPACE, key, value)
    }
}
