//! RootBuilder - reactor の設定と構築
//!
//! Config は起動時に検証する（Fail-fast）。不正な値は build() が
//! `ReactorError::InvalidConfig` で返す。

use serde::{Deserialize, Serialize};

use super::branch::Branch;
use super::root::Root;
use crate::component::{AsComponent, Component};
use crate::error::ReactorError;

/// Settings for one reactor.
///
/// # 使用例
/// ```ignore
/// let config = ReactorConfig::from_json(r#"{ "name": "io", "stack_size": 262144 }"#)?;
/// let branch = RootBuilder::from_config(config).build_branch(|parent| Worker::new(parent))?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// Shows up in logs, and names the branch thread.
    pub name: String,

    /// Stack size of the branch thread. Ignored for a plain root.
    pub stack_size: Option<usize>,

    /// Scheduler ticks between polls of the timer driver.
    pub event_interval: Option<u32>,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            stack_size: None,
            event_interval: None,
        }
    }
}

impl ReactorConfig {
    pub fn from_json(input: &str) -> Result<Self, ReactorError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn validate(&self) -> Result<(), ReactorError> {
        if self.name.trim().is_empty() {
            return Err(ReactorError::InvalidConfig("name must not be empty".to_string()));
        }
        if self.stack_size == Some(0) {
            return Err(ReactorError::InvalidConfig("stack_size must be positive".to_string()));
        }
        if self.event_interval == Some(0) {
            return Err(ReactorError::InvalidConfig(
                "event_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builds a [`Root`] or a [`Branch`] from a [`ReactorConfig`].
#[derive(Debug, Clone, Default)]
pub struct RootBuilder {
    config: ReactorConfig,
}

impl RootBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: ReactorConfig) -> Self {
        Self { config }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = Some(bytes);
        self
    }

    pub fn event_interval(mut self, ticks: u32) -> Self {
        self.config.event_interval = Some(ticks);
        self
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn build(self) -> Result<Root, ReactorError> {
        self.config.validate()?;
        Root::from_config(self.config, None)
    }

    /// Build a root registered under `parent`.
    ///
    /// The parent only takes part in teardown bookkeeping (see
    /// [`Component::adopt`]); the root still owns its reactor.
    pub fn build_with_parent<P>(self, parent: &P) -> Result<Root, ReactorError>
    where
        P: AsComponent + ?Sized,
    {
        self.config.validate()?;
        Root::from_config(self.config, Some(parent.as_component()))
    }

    /// Build a branch wrapping the component produced by `make`.
    pub fn build_branch<T, F>(self, make: F) -> Result<Branch<T>, ReactorError>
    where
        T: AsComponent,
        F: FnOnce(&Component) -> T,
    {
        self.config.validate()?;
        Branch::from_config(self.config, None, make)
    }

    pub fn build_branch_with_parent<P, T, F>(
        self,
        parent: &P,
        make: F,
    ) -> Result<Branch<T>, ReactorError>
    where
        P: AsComponent + ?Sized,
        T: AsComponent,
        F: FnOnce(&Component) -> T,
    {
        self.config.validate()?;
        Branch::from_config(self.config, Some(parent.as_component()), make)
    }
}
