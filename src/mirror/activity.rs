//! Activity filter — which source conversations are eligible for mirroring.
//!
//! The active set is rebuilt from scratch on every refresh and swapped in
//! as one `Arc`, so readers always see a complete snapshot.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{ConfigError, TransportError};
use crate::transport::{ConversationId, PeerRef, Transport};

/// Grouping consulted by default.
pub const DEFAULT_FOLDER: &str = "Personal";

/// Which signals make a conversation active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityPolicy {
    /// Unmuted dialogs only.
    Unmuted,
    /// Unmuted dialogs plus members of the named dialog filter.
    #[default]
    UnmutedAndFolder,
}

impl FromStr for ActivityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unmuted" => Ok(Self::Unmuted),
            "unmuted_and_folder" => Ok(Self::UnmutedAndFolder),
            other => Err(ConfigError::InvalidValue {
                key: "ACTIVITY_POLICY".into(),
                message: format!(
                    "unknown policy '{other}' (expected unmuted or unmuted_and_folder)"
                ),
            }),
        }
    }
}

/// Immutable snapshot of active conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet(HashSet<ConversationId>);

impl ActiveSet {
    pub fn contains(&self, conversation: ConversationId) -> bool {
        self.0.contains(&conversation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationId> {
        self.0.iter()
    }
}

impl FromIterator<ConversationId> for ActiveSet {
    fn from_iter<I: IntoIterator<Item = ConversationId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Members contributed by each source in the last cycle.
#[derive(Debug, Default)]
struct SourceMembers {
    dialogs: HashSet<ConversationId>,
    folder: HashSet<ConversationId>,
}

/// Maintains the current active set for the pipeline.
pub struct ActivityFilter {
    transport: Arc<dyn Transport>,
    policy: ActivityPolicy,
    folder: String,
    active: RwLock<Arc<ActiveSet>>,
    /// Also serializes concurrent refreshes.
    previous: Mutex<SourceMembers>,
}

impl ActivityFilter {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: ActivityPolicy,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            policy,
            folder: folder.into(),
            active: RwLock::new(Arc::new(ActiveSet::default())),
            previous: Mutex::new(SourceMembers::default()),
        }
    }

    pub fn policy(&self) -> ActivityPolicy {
        self.policy
    }

    /// Current snapshot. Cheap: clones the `Arc`, not the set.
    pub async fn snapshot(&self) -> Arc<ActiveSet> {
        Arc::clone(&*self.active.read().await)
    }

    pub async fn is_active(&self, conversation: ConversationId) -> bool {
        self.active.read().await.contains(conversation)
    }

    /// Rebuild the active set and swap it in. Returns the new set size.
    ///
    /// A source whose enumeration fails keeps the members it contributed
    /// last cycle. Unresolvable folder members are skipped.
    pub async fn refresh(&self) -> usize {
        let mut previous = self.previous.lock().await;

        match self.transport.get_dialogs().await {
            Ok(dialogs) => {
                previous.dialogs = dialogs
                    .iter()
                    .filter(|d| d.is_unmuted())
                    .map(|d| d.id)
                    .collect();
            }
            Err(e) => warn!(
                error = %e,
                kept = previous.dialogs.len(),
                "Failed to enumerate dialogs, keeping previous members"
            ),
        }

        if self.policy == ActivityPolicy::UnmutedAndFolder {
            match self.collect_folder_members().await {
                Ok(members) => previous.folder = members,
                Err(e) => warn!(
                    error = %e,
                    folder = %self.folder,
                    kept = previous.folder.len(),
                    "Failed to enumerate dialog filters, keeping previous members"
                ),
            }
        }

        let next: HashSet<ConversationId> =
            previous.dialogs.union(&previous.folder).copied().collect();
        let count = next.len();
        *self.active.write().await = Arc::new(ActiveSet(next));
        debug!(count, policy = ?self.policy, "Refreshed active conversations");
        count
    }

    async fn collect_folder_members(&self) -> Result<HashSet<ConversationId>, TransportError> {
        let filters = self.transport.get_dialog_filters().await?;
        let mut members = HashSet::new();

        for filter in filters.iter().filter(|f| f.title == self.folder) {
            for peer in &filter.include_peers {
                match *peer {
                    PeerRef::User(id) | PeerRef::Channel(id) => {
                        members.insert(ConversationId(id));
                    }
                    PeerRef::Group(id) => match self.transport.resolve_entity(id).await {
                        Ok(entity) => {
                            members.insert(ConversationId::group(entity.id));
                        }
                        Err(e) => {
                            warn!(group = id, error = %e, "Skipping unresolvable folder member");
                        }
                    },
                }
            }
        }
        Ok(members)
    }
}
