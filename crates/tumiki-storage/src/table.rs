//! Table name to collection mapping.

use std::borrow::Cow;
use std::fmt;

use crate::error::{StorageError, StorageResult};

/// Tables the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Employees,
    Reports,
    DailyReports,
    MeetingEntries,
    MorningMeeting,
    Schedules,
    Attendance,
    Shifts,
    RolePermissions,
    SidebarSettings,
    CsvSchedules,
    ChatConversations,
    ChatMessages,
    MonthlyHours,
}

impl Table {
    pub const ALL: [Table; 15] = [
        Table::Users,
        Table::Employees,
        Table::Reports,
        Table::DailyReports,
        Table::MeetingEntries,
        Table::MorningMeeting,
        Table::Schedules,
        Table::Attendance,
        Table::Shifts,
        Table::RolePermissions,
        Table::SidebarSettings,
        Table::CsvSchedules,
        Table::ChatConversations,
        Table::ChatMessages,
        Table::MonthlyHours,
    ];

    /// The name callers use for the table.
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Employees => "employees",
            Table::Reports => "reports",
            Table::DailyReports => "daily-reports",
            Table::MeetingEntries => "meeting-entries",
            Table::MorningMeeting => "morning-meeting",
            Table::Schedules => "schedules",
            Table::Attendance => "attendance",
            Table::Shifts => "shifts",
            Table::RolePermissions => "role-permissions",
            Table::SidebarSettings => "sidebar-settings",
            Table::CsvSchedules => "csv-schedules",
            Table::ChatConversations => "chat-conversations",
            Table::ChatMessages => "chat-messages",
            Table::MonthlyHours => "monthly_hours",
        }
    }

    /// The collection the table is stored in.
    ///
    /// Every current table lives in a collection of the same name; the
    /// mapping exists so a table can be moved without touching callers.
    pub fn collection(self) -> &'static str {
        self.name()
    }

    pub fn parse(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with a table name that has no mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownTablePolicy {
    /// Use the table name as the collection name.
    #[default]
    Passthrough,
    /// Fail with [`StorageError::UnknownTable`].
    Reject,
}

impl UnknownTablePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Reject } else { Self::Passthrough }
    }

    pub(crate) fn resolve<'a>(self, table: &'a str) -> StorageResult<Cow<'a, str>> {
        if let Some(known) = Table::parse(table) {
            return Ok(Cow::Borrowed(known.collection()));
        }
        match self {
            Self::Passthrough => {
                tracing::debug!(table, "table has no mapping, using it as the collection name");
                Ok(Cow::Borrowed(table))
            }
            Self::Reject => Err(StorageError::unknown_table(table)),
        }
    }
}

/// Anything that names a table: a [`Table`] or a raw string.
pub trait TableName {
    fn table_name(&self) -> &str;
}

impl TableName for Table {
    fn table_name(&self) -> &str {
        self.name()
    }
}

impl TableName for &str {
    fn table_name(&self) -> &str {
        self
    }
}

impl TableName for String {
    fn table_name(&self) -> &str {
        self.as_str()
    }
}
