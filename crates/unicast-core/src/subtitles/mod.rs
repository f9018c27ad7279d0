// ── Subtitle providers ──
//
// Registry of subtitle sources keyed by provider name, with fan-out
// search across providers and languages.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::entity::Entity;
use crate::error::CoreError;
use crate::hub::HubRef;
use crate::store::EntityManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(rename = "show")]
    #[strum(serialize = "show")]
    TvShow,
    #[serde(rename = "season")]
    #[strum(serialize = "season")]
    TvSeason,
    #[serde(rename = "episode")]
    #[strum(serialize = "episode")]
    TvEpisode,
    Custom,
}

/// The media a subtitle search is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    /// External identifiers (`imdb`, `tvdb`, ...).
    #[serde(default)]
    pub external: BTreeMap<String, String>,
}

/// A subtitle candidate returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: String,
    /// Name of the provider that found it; downloads are routed there.
    pub provider: String,
    pub language: String,
    pub release_name: String,
    pub format: String,
}

pub trait SubtitlesProvider: Entity {
    fn name(&self) -> &str;

    fn search(&self, media: &MediaRecord, lang: &str) -> BoxFuture<'static, Result<Vec<Subtitle>, CoreError>>;

    fn download(&self, subtitle: &Subtitle) -> BoxFuture<'static, Result<Bytes, CoreError>>;
}

/// Subtitle providers keyed by name.
pub type SubtitlesProvidersManager = EntityManager<dyn SubtitlesProvider, String>;

fn subtitles_provider_name(provider: &(dyn SubtitlesProvider + 'static)) -> String {
    provider.name().to_owned()
}

impl EntityManager<dyn SubtitlesProvider, String> {
    pub fn by_name(hub: HubRef) -> Self {
        Self::new(hub, subtitles_provider_name)
    }

    /// Search every requested provider in every language concurrently.
    ///
    /// `names` selects providers by name; `None` means all of them. Fails
    /// with [`CoreError::ProviderNotFound`] listing every unknown name
    /// before any search starts. A provider whose search fails contributes
    /// no results. Results are grouped per provider, then per language,
    /// in request order.
    pub async fn search(
        &self,
        media: &MediaRecord,
        langs: &[String],
        names: Option<&[String]>,
    ) -> Result<Vec<Subtitle>, CoreError> {
        let providers: Vec<Arc<dyn SubtitlesProvider>> = match names {
            None => self.iter().collect(),
            Some(names) => {
                let missing: Vec<&str> = names
                    .iter()
                    .filter(|name| !self.has_keyed(name))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    return Err(CoreError::ProviderNotFound {
                        names: missing.join(", "),
                    });
                }
                names.iter().filter_map(|name| self.get(name)).collect()
            }
        };

        let searches = providers.iter().flat_map(|provider| {
            langs.iter().map(move |lang| {
                let pending = provider.search(media, lang);
                let provider = provider.name().to_owned();
                let lang = lang.clone();
                async move {
                    match pending.await {
                        Ok(found) => {
                            debug!(%provider, %lang, count = found.len(), "subtitle search finished");
                            found
                        }
                        Err(e) => {
                            error!(%provider, %lang, error = %e, "subtitle search failed");
                            Vec::new()
                        }
                    }
                }
            })
        });

        let results = future::join_all(searches).await;
        Ok(results.into_iter().flatten().collect())
    }

    /// Download `subtitle` from the provider that found it.
    pub async fn download(&self, subtitle: &Subtitle) -> Result<Bytes, CoreError> {
        let provider = self
            .get(&subtitle.provider)
            .ok_or_else(|| CoreError::ProviderNotFound {
                names: subtitle.provider.clone(),
            })?;

        provider.download(subtitle).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Answers one subtitle per language after `delay`, or fails.
    struct Canned {
        name: &'static str,
        delay: Duration,
        fails: bool,
    }

    impl Entity for Canned {}

    impl SubtitlesProvider for Canned {
        fn name(&self) -> &str {
            self.name
        }

        fn search(&self, media: &MediaRecord, lang: &str) -> BoxFuture<'static, Result<Vec<Subtitle>, CoreError>> {
            let (delay, fails, provider) = (self.delay, self.fails, self.name.to_owned());
            let subtitle = Subtitle {
                id: format!("{}-{lang}", media.id),
                provider: provider.clone(),
                language: lang.to_owned(),
                release_name: media.title.clone(),
                format: "srt".into(),
            };
            async move {
                tokio::time::sleep(delay).await;
                if fails {
                    return Err(CoreError::Provider {
                        provider,
                        message: "quota exceeded".into(),
                    });
                }
                Ok(vec![subtitle])
            }
            .boxed()
        }

        fn download(&self, subtitle: &Subtitle) -> BoxFuture<'static, Result<Bytes, CoreError>> {
            let body = Bytes::from(format!("1\n00:00:01,000 --> 00:00:02,000\n{}\n", subtitle.id));
            future::ready(Ok(body)).boxed()
        }
    }

    fn manager() -> SubtitlesProvidersManager {
        let providers = SubtitlesProvidersManager::by_name(HubRef::detached());
        providers
            .add(Arc::new(Canned {
                name: "opensubtitles",
                delay: Duration::from_millis(30),
                fails: false,
            }))
            .add(Arc::new(Canned {
                name: "addic7ed",
                delay: Duration::from_millis(10),
                fails: false,
            }))
            .add(Arc::new(Canned {
                name: "broken",
                delay: Duration::ZERO,
                fails: true,
            }));
        providers
    }

    fn movie() -> MediaRecord {
        MediaRecord {
            id: "tt0133093".into(),
            kind: MediaKind::Movie,
            title: "The Matrix".into(),
            external: BTreeMap::new(),
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn search_fans_out_and_swallows_provider_failures() {
        let found = manager()
            .search(&movie(), &strings(&["en", "pt"]), None)
            .await
            .unwrap();

        let ids: Vec<(String, String)> = found.into_iter().map(|s| (s.provider, s.id)).collect();
        assert_eq!(
            ids,
            vec![
                ("opensubtitles".into(), "tt0133093-en".into()),
                ("opensubtitles".into(), "tt0133093-pt".into()),
                ("addic7ed".into(), "tt0133093-en".into()),
                ("addic7ed".into(), "tt0133093-pt".into()),
            ]
        );
    }

    #[tokio::test]
    async fn search_reports_every_unknown_provider() {
        let err = manager()
            .search(
                &movie(),
                &strings(&["en"]),
                Some(&strings(&["addic7ed", "podnapisi", "subscene"])),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Could not find providers named podnapisi, subscene"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn search_restricted_to_named_providers() {
        let found = manager()
            .search(&movie(), &strings(&["en"]), Some(&strings(&["addic7ed"])))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].provider, "addic7ed");
    }

    #[tokio::test]
    async fn download_routes_by_provider_name() {
        let providers = manager();
        let mut subtitle = Subtitle {
            id: "tt0133093-en".into(),
            provider: "addic7ed".into(),
            language: "en".into(),
            release_name: "The Matrix".into(),
            format: "srt".into(),
        };

        let body = providers.download(&subtitle).await.unwrap();
        assert!(body.ends_with(b"tt0133093-en\n"));

        subtitle.provider = "gone".into();
        assert!(matches!(
            providers.download(&subtitle).await,
            Err(CoreError::ProviderNotFound { names }) if names == "gone"
        ));
    }

    #[test]
    fn media_kind_uses_short_names() {
        assert_eq!(MediaKind::TvShow.to_string(), "show");
        assert_eq!(MediaKind::Movie.to_string(), "movie");
    }
}
