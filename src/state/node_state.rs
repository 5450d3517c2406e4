/// Node state definitions for tracking one crawl node's progress
///
/// A node is one (url, remaining depth) frame of the traversal. It exists only
/// while its task is running and is never persisted.
use std::fmt;

/// Represents the current state of a crawl node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    // ===== Active States =====
    /// Node was submitted but has not claimed its key yet
    Unvisited,

    /// Node won the registry claim and owns its resource
    Claimed,

    /// Document body was found in the content store
    CacheHit,

    /// Document is being fetched and saved
    Fetching,

    /// Document was fetched and saved
    Fetched,

    /// Child links were extracted from the body
    LinksExtracted,

    /// Child tasks were submitted and the node waits on its join counter
    FanOut,

    // ===== Terminal States =====
    /// All children reported, or there was nothing to do
    Joined,

    /// Fetch or storage failed; isolated to this node
    Failed,
}

impl NodeState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Joined | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: NodeState) -> bool {
        use NodeState::*;

        matches!(
            (*self, next),
            (Unvisited, Claimed)
                | (Unvisited, Joined)
                | (Claimed, CacheHit)
                | (Claimed, Fetching)
                | (Claimed, Failed)
                | (CacheHit, LinksExtracted)
                | (Fetching, Fetched)
                | (Fetching, Failed)
                | (Fetched, LinksExtracted)
                | (LinksExtracted, FanOut)
                | (LinksExtracted, Joined)
                | (FanOut, Joined)
        )
    }

    /// Returns a short lowercase name for logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Claimed => "claimed",
            Self::CacheHit => "cache_hit",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::LinksExtracted => "links_extracted",
            Self::FanOut => "fan_out",
            Self::Joined => "joined",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(NodeState::Joined.is_terminal());
        assert!(NodeState::Failed.is_terminal());

        assert!(!NodeState::Unvisited.is_terminal());
        assert!(!NodeState::Claimed.is_terminal());
        assert!(!NodeState::FanOut.is_terminal());
    }

    #[test]
    fn test_happy_path_fetch() {
        let path = [
            NodeState::Unvisited,
            NodeState::Claimed,
            NodeState::Fetching,
            NodeState::Fetched,
            NodeState::LinksExtracted,
            NodeState::FanOut,
            NodeState::Joined,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_happy_path_cache_hit_leaf() {
        assert!(NodeState::Claimed.can_transition_to(NodeState::CacheHit));
        assert!(NodeState::CacheHit.can_transition_to(NodeState::LinksExtracted));
        assert!(NodeState::LinksExtracted.can_transition_to(NodeState::Joined));
    }

    #[test]
    fn test_noop_node_joins_directly() {
        assert!(NodeState::Unvisited.can_transition_to(NodeState::Joined));
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(!NodeState::Failed.can_transition_to(NodeState::Joined));
        assert!(!NodeState::Joined.can_transition_to(NodeState::Claimed));
    }

    #[test]
    fn test_illegal_shortcuts() {
        assert!(!NodeState::Unvisited.can_transition_to(NodeState::Fetching));
        assert!(!NodeState::CacheHit.can_transition_to(NodeState::Failed));
        assert!(!NodeState::FanOut.can_transition_to(NodeState::Failed));
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeState::CacheHit.to_string(), "cache_hit");
        assert_eq!(NodeState::FanOut.to_string(), "fan_out");
    }
}
