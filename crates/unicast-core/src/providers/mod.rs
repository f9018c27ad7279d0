// ── Media providers ──
//
// Sources of playable media. The registry routes a media source string
// to the first provider that claims it.

mod kodi;

use std::sync::Arc;

use serde::Serialize;

pub use kodi::{KODI_KIND, KodiConfigSource, KodiMediaProvider, KodiMediaProviderFactory, kodi_factory};

use crate::entity::Entity;
use crate::factory::EntityFactoryManager;
use crate::hub::HubRef;
use crate::store::EntityManager;

pub trait MediaProvider: Entity {
    fn name(&self) -> &str;

    fn kind(&self) -> &str;

    /// Whether this provider can resolve `source`.
    fn matches(&self, source: &str) -> bool;

    fn summary(&self) -> ProviderSummary {
        ProviderSummary {
            name: self.name().to_owned(),
            kind: self.kind().to_owned(),
        }
    }
}

/// Serializable view of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub kind: String,
}

/// Providers keyed by name.
pub type ProvidersManager = EntityManager<dyn MediaProvider, String>;

/// Provider factories keyed by kind, forwarding into a [`ProvidersManager`].
pub type ProviderFactoriesManager = EntityFactoryManager<dyn MediaProvider, String, String>;

fn provider_name(provider: &(dyn MediaProvider + 'static)) -> String {
    provider.name().to_owned()
}

impl EntityManager<dyn MediaProvider, String> {
    pub fn by_name(hub: HubRef) -> Self {
        Self::new(hub, provider_name)
    }

    /// First provider, in insertion order, accepting `source`.
    pub fn match_source(&self, source: &str) -> Option<Arc<dyn MediaProvider>> {
        self.iter().find(|provider| provider.matches(source))
    }

    pub fn summaries(&self) -> Vec<ProviderSummary> {
        self.iter().map(|provider| provider.summary()).collect()
    }
}
