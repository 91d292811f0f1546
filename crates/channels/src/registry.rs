use std::{collections::HashMap, sync::Arc};

use crate::{event::Platform, plugin::ChannelConnector};

/// Registry of loaded channel connectors, keyed by platform.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<Platform, Arc<dyn ChannelConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: HashMap::new(),
        }
    }

    pub fn register(&mut self, connector: Arc<dyn ChannelConnector>) {
        self.connectors.insert(connector.platform(), connector);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn ChannelConnector>> {
        self.connectors.get(&platform).map(Arc::clone)
    }

    pub fn list(&self) -> Vec<Platform> {
        self.connectors.keys().copied().collect()
    }
}
