//! Table change records: what observers of a table get told after a commit.

/// Kind of write that touched a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
    /// Every row was removed at once.
    Cleared,
}

/// Notification that a committed write touched `table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChange {
    pub table: &'static str,
    pub kind: ChangeKind,
}

impl TableChange {
    #[must_use]
    pub fn new(table: &'static str, kind: ChangeKind) -> Self {
        Self { table, kind }
    }
}
