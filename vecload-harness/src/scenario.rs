/// Load-test scenarios selectable from the command line.
///
/// | Scenario | What runs |
/// |----------|-----------|
/// | Full     | write → settle → stats → read → optional delete |
/// | Write    | count-bounded batch upserts, then stats |
/// | Read     | stats, then time-bounded random queries |
/// | Storm    | stats, then time-bounded queries against every namespace |
/// | Delete   | delete-all with before/after counts |
/// | Stats    | one `describe_index_stats` snapshot |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Full,
    Write,
    Read,
    Storm,
    Delete,
    Stats,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::Full,
        Scenario::Write,
        Scenario::Read,
        Scenario::Storm,
        Scenario::Delete,
        Scenario::Stats,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "full" => Some(Scenario::Full),
            "write" => Some(Scenario::Write),
            "read" => Some(Scenario::Read),
            "storm" => Some(Scenario::Storm),
            "delete" => Some(Scenario::Delete),
            "stats" => Some(Scenario::Stats),
            _ => None,
        }
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            Scenario::Full => "full",
            Scenario::Write => "write",
            Scenario::Read => "read",
            Scenario::Storm => "storm",
            Scenario::Delete => "delete",
            Scenario::Stats => "stats",
        }
    }

    /// Section heading printed before the scenario runs.
    pub fn title(&self) -> &'static str {
        match self {
            Scenario::Full => "FULL LOAD TEST",
            Scenario::Write => "WRITE LOAD TEST",
            Scenario::Read => "READ LOAD TEST",
            Scenario::Storm => "AGGRESSIVE MULTI-NAMESPACE QUERY STORM",
            Scenario::Delete => "DELETING ALL VECTORS",
            Scenario::Stats => "INDEX STATS",
        }
    }

    /// Destructive scenarios only run when the operator passes `--yes`.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Scenario::Delete)
    }
}
