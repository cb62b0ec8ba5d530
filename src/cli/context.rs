use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agent_core::Navigator;
use anyhow::{Context, Result};
use api_capture::{ApiRequestStore, InMemoryApiStore};
use tracing::info;
use webnav_core_types::{LanguageModel, MockLanguageModel, NavigatorEvent};
use webnav_event_bus::{BusObserver, InMemoryBus};

use crate::browser_impl::HttpBrowserDriver;
use crate::cli::output::OutputFormat;
use crate::config::AppConfig;
use crate::llm::OllamaClient;

const EVENT_BUS_CAPACITY: usize = 256;

/// Per-command switches that shape the navigator.
#[derive(Clone, Copy, Debug, Default)]
pub struct NavigatorOptions {
    /// Scripted model instead of the model service.
    pub offline: bool,
    pub headless: bool,
}

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
    output: OutputFormat,
    bus: Arc<InMemoryBus<NavigatorEvent>>,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
            bus: InMemoryBus::new(EVENT_BUS_CAPACITY),
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn bus(&self) -> &Arc<InMemoryBus<NavigatorEvent>> {
        &self.bus
    }

    pub fn model(&self, offline: bool) -> Result<Arc<dyn LanguageModel>> {
        if offline {
            info!("using the offline scripted model");
            return Ok(Arc::new(MockLanguageModel::new()));
        }
        Ok(Arc::new(OllamaClient::new(self.config.model.clone())?))
    }

    pub fn api_store(&self) -> Result<Arc<dyn ApiRequestStore>> {
        match &self.config.storage.api_store_path {
            Some(path) => {
                let store = InMemoryApiStore::with_persistence(path)
                    .with_context(|| format!("opening API store {}", path.display()))?;
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(InMemoryApiStore::new())),
        }
    }

    pub fn navigator(&self, options: NavigatorOptions) -> Result<Arc<Navigator>> {
        let config = self.config();
        let driver = HttpBrowserDriver::new(Duration::from_secs(
            config.browser.page_timeout_secs.max(1),
        ))?;
        let mut navigator_config = config.navigator.clone();
        if options.headless {
            navigator_config = navigator_config.headless(true);
        }

        let navigator = Navigator::builder(self.model(options.offline)?, Arc::new(driver))
            .api_store(self.api_store()?)
            .observer(Arc::new(BusObserver::new(Arc::clone(&self.bus))))
            .config(navigator_config)
            .memory_config(config.memory.clone())
            .capture_config(config.capture.clone())
            .build();
        Ok(Arc::new(navigator))
    }
}
