//! Crawler coordinator - recursive crawl orchestration
//!
//! This module contains the crawl logic that ties the scheduler, the visited
//! registry, and the content store together:
//! - Claiming each canonical URL at most once per crawl
//! - Serving documents from the store or fetching and saving them
//! - Fanning out to extracted links as independent scheduler tasks
//! - Joining subtrees bottom-up so the crawl knows when it is finished
//!
//! Every `crawl` call builds a fresh [`CrawlContext`], so repeated crawls on
//! one `Crawler` never share a registry or a scheduler.

use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::join::{JoinCounter, JoinToken};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::scheduler::{SchedulerObserver, TaskScheduler, TracingObserver};
use crate::output::CrawlReport;
use crate::state::{NodeState, VisitedRegistry};
use crate::storage::ContentStore;
use crate::url::{parse_root_url, storage_key};
use crate::SpiderError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::oneshot;
use url::Url;

const DEFAULT_CONCURRENCY: usize = 2;
const DEFAULT_EXTENSION: &str = "html";

/// Recursive crawler over a link graph
///
/// The fetcher, store, and link extractor are shared by every crawl this
/// crawler runs.
pub struct Crawler<F, S, E = HtmlLinkExtractor> {
    fetcher: Arc<F>,
    store: Arc<S>,
    extractor: Arc<E>,
    concurrency: usize,
    default_extension: String,
    observer: Arc<dyn SchedulerObserver>,
}

impl<F, S> Crawler<F, S, HtmlLinkExtractor>
where
    F: Fetcher,
    S: ContentStore,
{
    /// Creates a crawler extracting links from HTML
    pub fn new(fetcher: F, store: S) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            extractor: Arc::new(HtmlLinkExtractor),
            concurrency: DEFAULT_CONCURRENCY,
            default_extension: DEFAULT_EXTENSION.to_string(),
            observer: Arc::new(TracingObserver),
        }
    }
}

impl<S> Crawler<HttpFetcher, S, HtmlLinkExtractor>
where
    S: ContentStore,
{
    /// Creates an HTTP crawler configured from `config`
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Crawler with concurrency and extension applied
    /// * `Err(SpiderError)` - The HTTP client could not be built
    pub fn from_config(config: &Config, store: S) -> Result<Self, SpiderError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent)?;

        Ok(Self::new(fetcher, store)
            .with_concurrency(config.crawler.concurrency)
            .with_default_extension(config.output.default_extension.clone()))
    }
}

impl<F, S, E> Crawler<F, S, E>
where
    F: Fetcher,
    S: ContentStore,
    E: LinkExtractor,
{
    /// Replaces the link extractor
    pub fn with_extractor<E2: LinkExtractor>(self, extractor: E2) -> Crawler<F, S, E2> {
        Crawler {
            fetcher: self.fetcher,
            store: self.store,
            extractor: Arc::new(extractor),
            concurrency: self.concurrency,
            default_extension: self.default_extension,
            observer: self.observer,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the extension used for documents whose URL has none
    pub fn with_default_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_extension = extension.into();
        self
    }

    /// Sets the observer each crawl's scheduler reports to
    pub fn with_observer(mut self, observer: Arc<dyn SchedulerObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Crawls the link graph reachable from `root`
    ///
    /// `max_depth` counts the root as level one, so a depth of 1 downloads
    /// only the root and a depth of 0 does nothing at all.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The traversal completed; node failures are in the report
    /// * `Err(SpiderError)` - The root URL is malformed
    pub async fn crawl(&self, root: &str, max_depth: u32) -> Result<CrawlReport, SpiderError> {
        let root_url = parse_root_url(root)?;
        let started = Instant::now();
        let report = CrawlReport::new(root_url.as_str(), max_depth, self.concurrency);

        if max_depth == 0 {
            tracing::info!("Max depth is 0, nothing to crawl for {}", root_url);
            return Ok(report);
        }

        tracing::info!(
            "Starting crawl of {} (max depth {}, concurrency {})",
            root_url,
            max_depth,
            self.concurrency
        );

        let context = Arc::new(CrawlContext {
            scheduler: TaskScheduler::with_observer(self.concurrency, Arc::clone(&self.observer)),
            registry: VisitedRegistry::new(),
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            default_extension: self.default_extension.clone(),
            report: Mutex::new(report),
        });

        let (joined_tx, joined_rx) = oneshot::channel();
        let root_join = JoinCounter::new(1, move || {
            let _ = joined_tx.send(());
        });

        context.submit_node(
            CrawlFrame {
                url: root_url,
                depth: max_depth,
            },
            JoinToken::new(root_join),
        );

        // Tokens report when dropped, so the root joins even if a task dies
        let _ = joined_rx.await;
        context.scheduler.wait_drained().await;

        let mut report = context.snapshot();
        report.elapsed = started.elapsed();

        tracing::info!(
            "Crawl finished: {} visited, {} fetched, {} from store, {} failed in {:.2}s",
            report.visited,
            report.fetched,
            report.cache_hits,
            report.failures.len(),
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }
}

/// A URL scheduled for a visit and the depth it still has to go
#[derive(Debug, Clone)]
struct CrawlFrame {
    url: Url,
    depth: u32,
}

/// Follows one node through its state machine
#[derive(Debug)]
struct NodeTracker {
    url: String,
    state: NodeState,
}

impl NodeTracker {
    fn new(url: &Url) -> Self {
        Self {
            url: url.to_string(),
            state: NodeState::Unvisited,
        }
    }

    fn advance(&mut self, next: NodeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {} for {}",
            self.state,
            next,
            self.url
        );
        tracing::trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
    }
}

/// State shared by every node task of a single crawl
struct CrawlContext<F, S, E> {
    scheduler: TaskScheduler,
    registry: VisitedRegistry,
    fetcher: Arc<F>,
    store: Arc<S>,
    extractor: Arc<E>,
    default_extension: String,
    report: Mutex<CrawlReport>,
}

impl<F, S, E> CrawlContext<F, S, E>
where
    F: Fetcher,
    S: ContentStore,
    E: LinkExtractor,
{
    fn submit_node(self: &Arc<Self>, frame: CrawlFrame, token: JoinToken) {
        let context = Arc::clone(self);
        self.scheduler
            .submit(async move { context.visit(frame, token).await });
    }

    /// Processes one node and fans out to its links
    ///
    /// The node's token is released when the node is done: right away for a
    /// duplicate, failure, or leaf, and only after every child has joined for
    /// a node that fans out.
    async fn visit(self: Arc<Self>, frame: CrawlFrame, token: JoinToken) -> Result<(), SpiderError> {
        let mut node = NodeTracker::new(&frame.url);

        if !self.registry.claim(frame.url.as_str()) {
            tracing::debug!("Already claimed, skipping {}", frame.url);
            self.tally(|report| report.duplicates += 1);
            node.advance(NodeState::Joined);
            return Ok(());
        }

        node.advance(NodeState::Claimed);
        self.tally(|report| report.visited += 1);

        let body = match self.load_or_fetch(&mut node, &frame.url).await {
            Ok(body) => body,
            Err(e) => {
                node.advance(NodeState::Failed);
                tracing::warn!("Failed to crawl {}: {}", frame.url, e);
                let message = e.to_string();
                self.tally(|report| report.record_failure(frame.url.as_str(), frame.depth, &message));
                return Err(e);
            }
        };

        let links = self.extractor.extract_links(&frame.url, &body);
        node.advance(NodeState::LinksExtracted);
        self.tally(|report| report.links_discovered += links.len());

        if frame.depth <= 1 || links.is_empty() {
            node.advance(NodeState::Joined);
            return Ok(());
        }

        node.advance(NodeState::FanOut);
        let child_depth = frame.depth - 1;
        tracing::debug!(
            "{} fans out to {} links at depth {}",
            frame.url,
            links.len(),
            child_depth
        );

        // The counter exists before any child runs, so no completion is missed.
        // Once it joins it reports to this node's parent itself.
        let join = JoinCounter::nested(links.len(), token, move || {
            node.advance(NodeState::Joined);
        });

        for url in links {
            self.submit_node(
                CrawlFrame {
                    url,
                    depth: child_depth,
                },
                JoinToken::new(Arc::clone(&join)),
            );
        }

        Ok(())
    }

    /// Returns the node's document from the store, fetching and saving it on a miss
    async fn load_or_fetch(&self, node: &mut NodeTracker, url: &Url) -> Result<String, SpiderError> {
        let key = storage_key(url, &self.default_extension);

        if let Some(body) = self.store.try_load(&key).await? {
            tracing::debug!("Loaded {} from store ({})", url, key);
            node.advance(NodeState::CacheHit);
            self.tally(|report| report.cache_hits += 1);
            return Ok(body);
        }

        node.advance(NodeState::Fetching);
        let body = self.fetcher.fetch(url).await?;
        self.store.save(&key, &body).await?;

        tracing::info!("Downloaded {} ({} bytes)", url, body.len());
        node.advance(NodeState::Fetched);
        self.tally(|report| report.fetched += 1);
        Ok(body)
    }

    fn tally(&self, update: impl FnOnce(&mut CrawlReport)) {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut report);
    }

    fn snapshot(&self) -> CrawlReport {
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
