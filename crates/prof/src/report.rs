//! Tree and summary rendering
//!
//! Everything here works on a borrowed view of an engine's registry. The
//! engine is responsible for closing open roots before calling in.

use crate::context::{Context, ContextId, Site};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write as _};
use std::time::Duration;

/// Render a duration as `seconds.nanoseconds`, nanoseconds padded to 9 digits.
///
/// ```rust
/// use prof::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(400)), "0.400000000");
/// ```
pub fn format_duration(duration: Duration) -> String {
    format!("{}.{:09}", duration.as_secs(), duration.subsec_nanos())
}

/// How summary entries are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SummaryKey {
    /// `file:name`, so every call site of one function is merged
    #[default]
    FileName,
    /// `file:line - name`, one entry per call site
    SiteLine,
}

impl SummaryKey {
    /// Build the summary key for a site.
    pub fn key_for(self, site: &Site) -> String {
        self.group_for(site).to_string()
    }

    fn group_for(self, site: &Site) -> SiteGroup {
        SiteGroup {
            file: site.file.clone(),
            line: match self {
                SummaryKey::FileName => None,
                SummaryKey::SiteLine => Some(site.line),
            },
            name: site.name.clone(),
        }
    }
}

/// Structured aggregation key. Sites are grouped on their parts, so a `:`
/// inside a file or scope name cannot merge two unrelated sites.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct SiteGroup {
    file: String,
    line: Option<u32>,
    name: String,
}

impl fmt::Display for SiteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{} - {}", self.file, line, self.name),
            None => write!(f, "{}:{}", self.file, self.name),
        }
    }
}

/// Report rendering settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Indentation emitted once per nesting level in the tree report
    pub indent: String,
    /// Key used to aggregate the summary report
    pub summary_key: SummaryKey,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            summary_key: SummaryKey::FileName,
        }
    }
}

impl ReportConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-level indentation.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Set the summary key.
    pub fn with_summary_key(mut self, summary_key: SummaryKey) -> Self {
        self.summary_key = summary_key;
        self
    }
}

/// Aggregated time for one summary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    /// Summary key, see [`SummaryKey`]
    pub key: String,
    /// Total of the outermost occurrences
    #[serde(with = "duration_serde")]
    pub total: Duration,
}

/// Owned copy of a recorded scope and everything nested in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextNode {
    /// Registry id of the scope
    pub id: ContextId,
    /// Identifying site
    pub site: Site,
    /// Captured argument strings
    pub arguments: Vec<String>,
    /// Elapsed time (zero if still open)
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Whether the scope had closed when the snapshot was taken
    pub closed: bool,
    /// Nested scopes in creation order
    pub children: Vec<ContextNode>,
}

impl ContextNode {
    /// Time not covered by direct children.
    pub fn self_time(&self) -> Duration {
        let children_time: Duration = self.children.iter().map(|c| c.duration).sum();
        self.duration.saturating_sub(children_time)
    }

    /// Number of nodes in this subtree, including this one.
    pub fn total_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.total_count()).sum::<usize>()
    }

    /// All nodes in this subtree with the given name, pre-order.
    pub fn find(&self, name: &str) -> Vec<&ContextNode> {
        fn find_recursive<'a>(node: &'a ContextNode, name: &str, results: &mut Vec<&'a ContextNode>) {
            if node.site.name == name {
                results.push(node);
            }
            for child in &node.children {
                find_recursive(child, name, results);
            }
        }

        let mut results = Vec::new();
        find_recursive(self, name, &mut results);
        results
    }
}

/// Snapshot of an engine suitable for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileExport {
    /// Root scopes in registry order
    pub roots: Vec<ContextNode>,
    /// Per-key totals, largest first
    pub summary: Vec<SummaryEntry>,
}

pub(crate) fn render_tree(records: &[Context], roots: &[ContextId], config: &ReportConfig) -> String {
    fn render_node(
        records: &[Context],
        id: ContextId,
        depth: usize,
        indent: &str,
        output: &mut String,
    ) {
        let ctx = &records[id.index()];
        // Writing into a String cannot fail.
        let _ = writeln!(
            output,
            "{}{}:{} - {}({}) - {}",
            indent.repeat(depth),
            ctx.file(),
            ctx.line(),
            ctx.name(),
            ctx.argument_string(),
            format_duration(ctx.duration())
        );
        for &child in ctx.children() {
            render_node(records, child, depth + 1, indent, output);
        }
    }

    let mut output = String::new();
    for &root in roots {
        render_node(records, root, 0, &config.indent, &mut output);
    }
    output
}

pub(crate) fn render_summary(entries: &[SummaryEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        let _ = writeln!(output, "{} - {}", entry.key, format_duration(entry.total));
    }
    output
}

/// Total time per key, counting only the outermost occurrence of a key on
/// any root-to-leaf path.
pub(crate) fn summarize(records: &[Context], roots: &[ContextId], mode: SummaryKey) -> Vec<SummaryEntry> {
    fn accumulate(
        records: &[Context],
        id: ContextId,
        mode: SummaryKey,
        totals: &mut HashMap<SiteGroup, Duration>,
        charged: &mut HashSet<SiteGroup>,
    ) {
        let ctx = &records[id.index()];
        let group = mode.group_for(ctx.site());

        // A group already charged by an ancestor is a recursive call.
        let outermost = charged.insert(group.clone());
        if outermost {
            let total = totals.entry(group.clone()).or_insert(Duration::ZERO);
            *total = total.saturating_add(ctx.duration());
        }

        for &child in ctx.children() {
            accumulate(records, child, mode, totals, charged);
        }

        if outermost {
            charged.remove(&group);
        }
    }

    let mut totals = HashMap::new();
    for &root in roots {
        let mut charged = HashSet::new();
        accumulate(records, root, mode, &mut totals, &mut charged);
    }

    let mut grouped: Vec<(SiteGroup, String, Duration)> = totals
        .into_iter()
        .map(|(group, total)| {
            let key = group.to_string();
            (group, key, total)
        })
        .collect();
    grouped.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.0.cmp(&b.0))
    });
    grouped
        .into_iter()
        .map(|(_, key, total)| SummaryEntry { key, total })
        .collect()
}

pub(crate) fn build_node(records: &[Context], id: ContextId) -> ContextNode {
    let ctx = &records[id.index()];
    ContextNode {
        id,
        site: ctx.site().clone(),
        arguments: ctx.arguments().to_vec(),
        duration: ctx.duration(),
        closed: ctx.is_closed(),
        children: ctx
            .children()
            .iter()
            .map(|&child| build_node(records, child))
            .collect(),
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_nanos())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
