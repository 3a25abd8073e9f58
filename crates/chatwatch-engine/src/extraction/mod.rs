//! Snapshot extraction: turn the rendered chat list into a ranked name list.
//!
//! Extraction never fails from the caller's point of view. A missing chat
//! list yields an empty snapshot; any backend failure yields the `"Error"`
//! sentinel with [`ExtractionStatus::Failed`] so the poll loop can skip the
//! tick instead of reporting a bogus change.

pub mod heuristics;
pub mod phone;

use crate::resolution::chain::{CONVERSATION_LIST, NAME_LABEL, PHONE_NUMBER};
use crate::resolution::{DomQuery, Resolution, resolve};
use crate::snapshot::{ConversationSnapshot, TOP_N};
use chatwatch_common::error::BackendError;
use chatwatch_common::protocol::{NodeDetails, NodeId};
use heuristics::{text_label, title_label};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    Complete,
    /// No selector of the conversation-list chain matched.
    NoConversations,
    /// The backend failed mid-extraction; the snapshot is the error sentinel.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub snapshot: ConversationSnapshot,
    /// Phone-like text spotted in each row, aligned with `snapshot`.
    pub phones: [Option<String>; TOP_N],
    pub status: ExtractionStatus,
}

impl Extraction {
    fn failed(reason: String) -> Self {
        Self {
            snapshot: ConversationSnapshot::error_sentinel(),
            phones: Default::default(),
            status: ExtractionStatus::Failed(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ExtractionStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractorOptions {
    /// Put "No chats found" in the first slot when the list is missing.
    pub diagnostic_sentinel: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotExtractor {
    options: ExtractorOptions,
}

impl SnapshotExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }

    pub async fn extract<D: DomQuery + ?Sized>(&self, dom: &mut D) -> Extraction {
        match self.try_extract(dom).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Snapshot extraction failed: {}", e);
                Extraction::failed(e.to_string())
            }
        }
    }

    async fn try_extract<D: DomQuery + ?Sized>(
        &self,
        dom: &mut D,
    ) -> Result<Extraction, BackendError> {
        // Handles from the previous tick point at rows that have likely re-rendered.
        dom.release_all().await?;

        let entries = match resolve(dom, &CONVERSATION_LIST, None).await? {
            Resolution::Found { selector, nodes } => {
                debug!("Found {} conversation rows via '{}'", nodes.len(), selector);
                nodes
            }
            Resolution::NotFound => {
                debug!("No conversation list matched");
                let snapshot = if self.options.diagnostic_sentinel {
                    ConversationSnapshot::not_found_sentinel()
                } else {
                    ConversationSnapshot::empty()
                };
                return Ok(Extraction {
                    snapshot,
                    phones: Default::default(),
                    status: ExtractionStatus::NoConversations,
                });
            }
        };

        let stamp = chrono::Utc::now().timestamp_millis();
        let mut names = Vec::with_capacity(TOP_N);
        let mut phones: [Option<String>; TOP_N] = Default::default();

        for (rank, entry) in entries.into_iter().take(TOP_N).enumerate() {
            let details = dom.describe(entry).await?;
            let label = match label_from_title(dom, entry).await? {
                Some(name) => Some(name),
                None => details
                    .text_nodes
                    .iter()
                    .find_map(|t| text_label(t))
                    .map(str::to_string),
            };
            // Placeholders carry a timestamp that looks like a number.
            phones[rank] = phone_hint(dom, entry, label.as_deref(), &details).await?;
            names.push(label.unwrap_or_else(|| placeholder(rank, stamp)));
        }

        Ok(Extraction {
            snapshot: ConversationSnapshot::from_ranked(names),
            phones,
            status: ExtractionStatus::Complete,
        })
    }
}

/// Name used when a row has no usable label. Unique per extraction so it
/// never equals the previous tick's placeholder.
fn placeholder(rank: usize, stamp: i64) -> String {
    format!("Chat {} ({})", rank + 1, stamp)
}

async fn label_from_title<D: DomQuery + ?Sized>(
    dom: &mut D,
    entry: NodeId,
) -> Result<Option<String>, BackendError> {
    let labels = match resolve(dom, &NAME_LABEL, Some(entry)).await? {
        Resolution::Found { nodes, .. } => nodes,
        Resolution::NotFound => return Ok(None),
    };
    for label in labels {
        let details = match dom.describe(label).await {
            Ok(details) => details,
            Err(e) if e.is_query_error() => continue,
            Err(e) => return Err(e),
        };
        if let Some(title) = title_label(details.title.as_deref()) {
            return Ok(Some(title.to_string()));
        }
    }
    Ok(None)
}

async fn phone_hint<D: DomQuery + ?Sized>(
    dom: &mut D,
    entry: NodeId,
    label: Option<&str>,
    entry_details: &NodeDetails,
) -> Result<Option<String>, BackendError> {
    if let Some(phone) = label.and_then(phone::find_phone) {
        return Ok(Some(phone));
    }
    if let Resolution::Found { nodes, .. } = resolve(dom, &PHONE_NUMBER, Some(entry)).await? {
        for node in nodes {
            let details = match dom.describe(node).await {
                Ok(details) => details,
                Err(e) if e.is_query_error() => continue,
                Err(e) => return Err(e),
            };
            let found = details
                .title
                .as_deref()
                .and_then(phone::find_phone)
                .or_else(|| phone::find_phone(&details.text));
            if found.is_some() {
                return Ok(found);
            }
        }
    }
    Ok(phone::find_phone(&entry_details.text))
}
