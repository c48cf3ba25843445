use crate::upstream::TargetGroup;

/// Longest-prefix-match router over configured target groups (C6).
///
/// Groups are sorted once at construction by descending prefix length, so
/// matching is a linear scan that stops at the first (most specific)
/// prefix match — a deliberately simpler structure than a radix tree since
/// the expected group count is small and there is no host-based
/// partitioning in scope.
pub struct Router {
    groups: Vec<TargetGroup>,
}

impl Router {
    pub fn new(mut groups: Vec<TargetGroup>) -> Self {
        groups.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Self { groups }
    }

    /// Find the target group whose `path_prefix` is the longest prefix of
    /// `request_path`. Matching is a literal byte-sequence prefix test
    /// (§4.1): `/api` matches `/api`, `/api/...`, and `/apiextra` alike —
    /// there is no segment-boundary requirement.
    pub fn route(&self, request_path: &str) -> Option<&TargetGroup> {
        self.groups
            .iter()
            .find(|g| path_matches_prefix(request_path, &g.path_prefix))
    }

    pub fn groups(&self) -> &[TargetGroup] {
        &self.groups
    }
}

fn path_matches_prefix(path: &str, prefix: &str) -> bool {
    path.starts_with(prefix)
}
