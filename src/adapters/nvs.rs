//! NVS (Non-Volatile Storage) adapter.
//!
//! Persists [`AppConfig`] as a postcard blob and performs the storage
//! half of a factory reset (erase everything).  The simulation backend
//! keeps the blob in memory.

use log::{info, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &core::ffi::CStr = c"contact";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &core::ffi::CStr = c"appcfg";

const MAX_BLOB_SIZE: usize = 256;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    blob: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsConfigStore {
    /// Initialise NVS flash.  A partition with no free pages or from a
    /// newer IDF version is erased and re-initialised.
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(Error::Config("NVS init failed"));
                }
            } else if ret != ESP_OK {
                return Err(Error::Config("NVS init failed"));
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            blob: std::cell::RefCell::new(None),
        })
    }

    /// Stored config, or defaults when nothing usable is stored.
    pub fn load(&self) -> AppConfig {
        match self.read_blob() {
            Ok(Some(bytes)) => match postcard::from_bytes::<AppConfig>(&bytes) {
                Ok(cfg) if cfg.validate().is_ok() => {
                    info!("NvsConfigStore: loaded config ({} bytes)", bytes.len());
                    cfg
                }
                Ok(_) => {
                    warn!("NvsConfigStore: stored config out of range, using defaults");
                    AppConfig::default()
                }
                Err(_) => {
                    warn!("NvsConfigStore: stored config corrupted, using defaults");
                    AppConfig::default()
                }
            },
            Ok(None) => {
                info!("NvsConfigStore: no stored config, using defaults");
                AppConfig::default()
            }
            Err(e) => {
                warn!("NvsConfigStore: {}, using defaults", e);
                AppConfig::default()
            }
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        config.validate()?;
        let bytes =
            postcard::to_allocvec(config).map_err(|_| Error::Config("config encode failed"))?;
        self.write_blob(&bytes)?;
        info!("NvsConfigStore: config saved ({} bytes)", bytes.len());
        Ok(())
    }

    // ── Simulation backend ────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.borrow().clone())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(Error::Config("config blob too large"));
        }
        *self.blob.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }

    /// Drop everything persisted.
    #[cfg(not(target_os = "espidf"))]
    pub fn erase_all(&self) -> Result<()> {
        *self.blob.borrow_mut() = None;
        warn!("NvsConfigStore: storage erased (simulation)");
        Ok(())
    }

    // ── ESP-IDF backend ───────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> core::result::Result<T, i32>,
    ) -> core::result::Result<T, i32> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: namespace is a valid C string; handle is written on success.
        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        // SAFETY: handle came from a successful nvs_open.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        let result = Self::with_handle(false, |handle| {
            let mut size: usize = 0;
            // SAFETY: null buffer asks for the stored size only.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr(), core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }
            let mut buf = vec![0u8; size];
            // SAFETY: buf holds `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr(), buf.as_mut_ptr().cast(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(Some(bytes)),
            Err(rc) if rc == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(rc) => {
                warn!("NvsConfigStore: read failed (rc={})", rc);
                Err(Error::Config("NVS read failed"))
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(Error::Config("config blob too large"));
        }
        Self::with_handle(true, |handle| {
            // SAFETY: bytes is valid for its length; key is a valid C string.
            let ret = unsafe {
                nvs_set_blob(handle, CONFIG_KEY.as_ptr(), bytes.as_ptr().cast(), bytes.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // SAFETY: handle is open read-write.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|rc| {
            warn!("NvsConfigStore: write failed (rc={})", rc);
            Error::Config("NVS write failed")
        })
    }

    /// Erase the whole NVS partition.
    #[cfg(target_os = "espidf")]
    pub fn erase_all(&self) -> Result<()> {
        // SAFETY: no NVS handles are held across this call.
        let ret = unsafe { nvs_flash_erase() };
        if ret != ESP_OK {
            return Err(Error::Config("NVS erase failed"));
        }
        warn!("NvsConfigStore: storage erased");
        Ok(())
    }
}
