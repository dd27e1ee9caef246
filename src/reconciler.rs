//! Debounced keyword → gallery reconciliation.
//!
//! Every text change calls [`FetchReconciler::trigger`], which issues a new
//! generation number and spawns a task for it. The task waits out the
//! debounce window and gives up without any I/O if a newer trigger arrived in
//! the meantime. Otherwise it searches all keywords concurrently, joins the
//! results, and reports a [`ReconcileEvent::Completed`] tagged with its
//! generation. The receiver commits only events whose generation is still
//! the latest, so a slow older batch can never overwrite a newer one.

use crate::keywords::keyword_color;
use crate::models::{GalleryItem, ImageRecord};
use crate::unsplash::ImageSearch;
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(800);

/// How long a finished gallery is reused for an identical keyword list.
pub const GALLERY_TTL: Duration = Duration::from_secs(5 * 60);

pub const NO_RESULTS_MESSAGE: &str = "No images found for these keywords";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch images";

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The keyword set was empty.
    Cleared,
    /// At least one keyword produced an image, in keyword order.
    Gallery(Vec<GalleryItem>),
    /// Keywords were present but none produced an image.
    NoResults,
    /// The orchestration itself failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    /// The debounce window passed and the network phase began.
    Started { generation: u64 },
    Completed {
        generation: u64,
        keywords: Vec<String>,
        outcome: FetchOutcome,
    },
}

impl ReconcileEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ReconcileEvent::Started { generation } | ReconcileEvent::Completed { generation, .. } => {
                *generation
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub debounce: Duration,
    pub gallery_ttl: Duration,
    /// Fixed seed for representative picks; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_WINDOW,
            gallery_ttl: GALLERY_TTL,
            seed: None,
        }
    }
}

// ============================================================================
// Gallery Cache
// ============================================================================

/// Recently built galleries keyed by their exact keyword list.
#[derive(Debug, Default)]
struct GalleryCache {
    entries: HashMap<Vec<String>, (Instant, Vec<GalleryItem>)>,
}

impl GalleryCache {
    fn get(&mut self, keywords: &[String], ttl: Duration) -> Option<Vec<GalleryItem>> {
        let now = Instant::now();
        self.entries.retain(|_, (at, _)| now.duration_since(*at) < ttl);
        self.entries.get(keywords).map(|(_, items)| items.clone())
    }

    fn put(&mut self, keywords: Vec<String>, items: Vec<GalleryItem>) {
        self.entries.insert(keywords, (Instant::now(), items));
    }
}

// ============================================================================
// Fan-out / Fan-in
// ============================================================================

/// Pick one image per keyword uniformly at random from its pool.
///
/// Keywords keep their own entry even when two of them land on the same
/// image id, and entries keep the order of `pools`.
pub fn select_representatives<R: Rng + ?Sized>(
    pools: Vec<(String, Vec<ImageRecord>)>,
    rng: &mut R,
) -> Vec<GalleryItem> {
    pools
        .into_iter()
        .filter(|(_, pool)| !pool.is_empty())
        .map(|(keyword, mut pool)| {
            let index = rng.gen_range(0..pool.len());
            GalleryItem {
                image: pool.swap_remove(index),
                color: keyword_color(&keyword),
                keyword,
            }
        })
        .collect()
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return FETCH_FAILED_MESSAGE.to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        FETCH_FAILED_MESSAGE.to_string()
    }
}

/// Search every keyword concurrently and build the gallery.
///
/// A failing or empty keyword is dropped; only a failure of the fan-out
/// itself turns the whole batch into [`FetchOutcome::Failed`].
pub async fn fetch_gallery<S: ImageSearch, R: Rng + ?Sized>(
    search: &Arc<S>,
    keywords: &[String],
    rng: &mut R,
) -> FetchOutcome {
    if keywords.is_empty() {
        return FetchOutcome::Cleared;
    }

    let handles: Vec<JoinHandle<_>> = keywords
        .iter()
        .map(|keyword| {
            let search = Arc::clone(search);
            let keyword = keyword.clone();
            tokio::spawn(async move { search.search(&keyword).await })
        })
        .collect();

    let mut pools = Vec::with_capacity(keywords.len());
    for (keyword, joined) in keywords.iter().zip(join_all(handles).await) {
        match joined {
            Ok(Ok(pool)) if !pool.is_empty() => pools.push((keyword.clone(), pool)),
            Ok(Ok(_)) => log::debug!("no images for {:?}", keyword),
            Ok(Err(e)) => log::debug!("search for {:?} dropped: {}", keyword, e),
            Err(e) => {
                log::warn!("search task for {:?} failed: {}", keyword, e);
                return FetchOutcome::Failed(panic_message(e));
            }
        }
    }

    let items = select_representatives(pools, rng);
    if items.is_empty() {
        FetchOutcome::NoResults
    } else {
        FetchOutcome::Gallery(items)
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Issues generations and runs debounced fetches. Events are delivered as `E`
/// so a session can merge them into its own event stream.
pub struct FetchReconciler<S, E = ReconcileEvent> {
    search: Arc<S>,
    latest: Arc<AtomicU64>,
    cache: Arc<Mutex<GalleryCache>>,
    config: ReconcilerConfig,
    events: mpsc::UnboundedSender<E>,
}

impl<S, E> FetchReconciler<S, E>
where
    S: ImageSearch,
    E: From<ReconcileEvent> + Send + 'static,
{
    pub fn new(search: Arc<S>, config: ReconcilerConfig, events: mpsc::UnboundedSender<E>) -> Self {
        Self {
            search,
            latest: Arc::new(AtomicU64::new(0)),
            cache: Arc::new(Mutex::new(GalleryCache::default())),
            config,
            events,
        }
    }

    /// Generation of the most recent trigger.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }

    /// Schedule a fetch for `keywords`, superseding every earlier trigger.
    /// Returns the generation that the eventual events will carry.
    pub fn trigger(&self, keywords: Vec<String>) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let search = Arc::clone(&self.search);
        let latest = Arc::clone(&self.latest);
        let cache = Arc::clone(&self.cache);
        let config = self.config.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep(config.debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                log::debug!("generation {} superseded before search", generation);
                return;
            }

            let cached = match cache.lock() {
                Ok(mut c) => c.get(&keywords, config.gallery_ttl),
                Err(_) => None,
            };

            let outcome = match cached {
                Some(items) => FetchOutcome::Gallery(items),
                None => {
                    if !keywords.is_empty() {
                        events.send(ReconcileEvent::Started { generation }.into()).ok();
                    }
                    let mut rng = match config.seed {
                        Some(seed) => StdRng::seed_from_u64(seed ^ generation),
                        None => StdRng::from_entropy(),
                    };
                    let outcome = fetch_gallery(&search, &keywords, &mut rng).await;
                    if let FetchOutcome::Gallery(items) = &outcome {
                        if let Ok(mut c) = cache.lock() {
                            c.put(keywords.clone(), items.clone());
                        }
                    }
                    outcome
                }
            };

            events
                .send(
                    ReconcileEvent::Completed {
                        generation,
                        keywords,
                        outcome,
                    }
                    .into(),
                )
                .ok();
        });

        generation
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
