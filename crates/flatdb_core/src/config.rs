//! Store configuration.

/// Driver used when none is configured.
pub const DEFAULT_DRIVER: &str = "btree";

/// Options for opening a [`KeyStore`](crate::KeyStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Name of the engine driver.
    pub driver: String,

    /// Share the connection with other stores opened on the same path,
    /// control string and driver.
    pub persistent: bool,

    /// Namespace selected right after open. Empty means none.
    pub namespace: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            persistent: false,
            namespace: String::new(),
        }
    }
}

impl StoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for the named driver.
    #[must_use]
    pub fn with_driver(driver: impl Into<String>) -> Self {
        Self::default().driver(driver)
    }

    /// Sets the driver.
    #[must_use]
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Sets whether the connection is shared.
    #[must_use]
    pub const fn persistent(mut self, value: bool) -> Self {
        self.persistent = value;
        self
    }

    /// Sets the initial namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
