use crate::dates::DateFilter;
use crate::orientation::Orientation;
use api_client::MediaKind;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveView {
    #[default]
    Active,
    Archived,
    All,
}

impl std::str::FromStr for ArchiveView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(ArchiveView::Active),
            "archived" => Ok(ArchiveView::Archived),
            "all" => Ok(ArchiveView::All),
            other => Err(format!("unknown archive view: {}", other)),
        }
    }
}

/// What the filters need to know about one file.
#[derive(Debug, Clone, Copy)]
pub struct FileFacts {
    pub kind: MediaKind,
    pub archived: bool,
    pub hidden: bool,
    pub orientation: Orientation,
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub archive_view: ArchiveView,
    pub show_hidden: bool,
    pub kind: Option<MediaKind>,
    pub orientation: Option<Orientation>,
    pub date: Option<DateFilter>,
}

impl Filters {
    pub fn matches(&self, facts: &FileFacts, today: NaiveDate) -> bool {
        let archive_ok = match self.archive_view {
            ArchiveView::Active => !facts.archived,
            ArchiveView::Archived => facts.archived,
            ArchiveView::All => true,
        };
        if !archive_ok || (facts.hidden && !self.show_hidden) {
            return false;
        }
        if self.kind.is_some_and(|k| k != facts.kind) {
            return false;
        }
        if self.orientation.is_some_and(|o| o != facts.orientation) {
            return false;
        }
        match (&self.date, facts.day) {
            (None, _) => true,
            // Undated files never match a date filter.
            (Some(_), None) => false,
            (Some(filter), Some(day)) => filter.contains(day, today),
        }
    }
}
