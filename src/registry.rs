//! Registry of traced drivers, owned by the application.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TracingConfig;
use crate::connection::ConnectionProxy;
use crate::driver::Driver;
use crate::driver_proxy::TracedDriver;
use crate::error::{Error, Result};

/// Alias a raw driver name is registered under.
pub fn traced_driver_name(name: &str) -> String {
    format!("{name}.traced")
}

/// Maps traced aliases to drivers.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = DriverRegistry::new();
/// registry.register("mysql", Arc::new(MySqlDriver), TracingConfig::default())?;
///
/// let mut conn = registry.open("mysql.traced", "user:password@/dbname")?;
/// ```
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<TracedDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` under `<name>.traced`.
    ///
    /// Returns [`Error::AlreadyRegistered`] if the alias is taken; the
    /// existing registration is kept.
    pub fn register(
        &mut self,
        name: &str,
        driver: Arc<dyn Driver>,
        config: TracingConfig,
    ) -> Result<Arc<TracedDriver>> {
        self.register_traced(TracedDriver::new(name, driver, config))
    }

    /// Register an already configured traced driver under its alias.
    pub fn register_traced(&mut self, driver: TracedDriver) -> Result<Arc<TracedDriver>> {
        let alias = traced_driver_name(driver.driver_name());
        if self.drivers.contains_key(&alias) {
            return Err(Error::AlreadyRegistered(alias));
        }
        let driver = Arc::new(driver);
        self.drivers.insert(alias, driver.clone());
        Ok(driver)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.drivers.contains_key(alias)
    }

    pub fn get(&self, alias: &str) -> Option<Arc<TracedDriver>> {
        self.drivers.get(alias).cloned()
    }

    /// Registered aliases, sorted.
    pub fn drivers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Open a traced connection through the driver registered as `alias`.
    pub fn open(&self, alias: &str, dsn: &str) -> Result<ConnectionProxy> {
        let driver = self
            .drivers
            .get(alias)
            .ok_or_else(|| Error::UnknownDriver(alias.to_string()))?;
        driver.open_traced(dsn)
    }
}
