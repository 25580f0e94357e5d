use crate::dates::{bucket_day, DateFilter, DateMethod, LocalZone};
use crate::filter::{ArchiveView, FileFacts, Filters};
use crate::group::{GroupBy, Panels, Tile};
use crate::orientation::{self, Orientation, OrientationSource};
use api_client::{MediaFile, MediaKind, MediaPage};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use store::{FlagSet, KeyValueStore, Note, NoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Grid,
    Selected(String),
}

#[derive(Debug)]
pub enum Message {
    Mount,
    SentinelVisible,
    PageLoaded {
        generation: u64,
        result: Result<MediaPage, String>,
    },
    Unmount,
    SelectFile(String),
    ClosePhoto,
    ToggleSelect(String),
    ClearSelection,
    ArchiveSelected,
    HideSelected,
    ToggleArchive(String),
    ToggleHidden(String),
    ShowHidden(bool),
    SaveNote(String, String),
    SetArchiveView(ArchiveView),
    SetKindFilter(Option<MediaKind>),
    SetOrientationFilter(Option<Orientation>),
    SetDateFilter(Option<DateFilter>),
    SetDateMethod(DateMethod),
    SetGroupBy(GroupBy),
    DimensionsMeasured(String, u32, u32),
    MeasureFailed(String),
    DismissError(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    FetchPage {
        generation: u64,
        page_token: Option<String>,
    },
    MeasureDimensions(Vec<String>),
    Batch(Vec<Command>),
}

impl Command {
    pub fn batch(commands: Vec<Command>) -> Command {
        let mut commands: Vec<Command> = commands
            .into_iter()
            .filter(|c| *c != Command::None)
            .collect();
        match commands.len() {
            0 => Command::None,
            1 => commands.remove(0),
            _ => Command::Batch(commands),
        }
    }
}

/// Settings fixed for the lifetime of a gallery.
#[derive(Debug, Clone)]
pub struct GalleryOptions {
    pub local_zone: LocalZone,
    /// Overrides the current day for relative date filters.
    pub today: Option<NaiveDate>,
    pub date_method: DateMethod,
    pub group_by: GroupBy,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        GalleryOptions {
            local_zone: LocalZone::System,
            today: None,
            date_method: DateMethod::default(),
            group_by: GroupBy::default(),
        }
    }
}

/// Application state for one gallery view. Every change goes through
/// [`Gallery::update`]; side effects come back out as [`Command`]s.
pub struct Gallery<S: KeyValueStore> {
    files: Vec<MediaFile>,
    seen: HashSet<String>,
    next_page_token: Option<String>,
    first_page_loaded: bool,
    load_state: LoadState,
    mounted: bool,
    generation: u64,
    errors: Vec<String>,
    measured: HashMap<String, (u32, u32)>,
    measuring: HashSet<String>,
    measure_failed: HashSet<String>,
    selection: BTreeSet<String>,
    view: ViewState,
    notes: NoteStore<S>,
    note_overlay: HashMap<String, Note>,
    archived: FlagSet<S>,
    hidden: FlagSet<S>,
    filters: Filters,
    group_by: GroupBy,
    date_method: DateMethod,
    local_zone: LocalZone,
    today: Option<NaiveDate>,
}

impl<S: KeyValueStore> Gallery<S> {
    pub fn new(store: S, options: GalleryOptions) -> Self {
        let notes = NoteStore::new(store.clone());
        let note_overlay = notes.get_all();
        Gallery {
            files: Vec::new(),
            seen: HashSet::new(),
            next_page_token: None,
            first_page_loaded: false,
            load_state: LoadState::Idle,
            mounted: false,
            generation: 0,
            errors: Vec::new(),
            measured: HashMap::new(),
            measuring: HashSet::new(),
            measure_failed: HashSet::new(),
            selection: BTreeSet::new(),
            view: ViewState::Grid,
            notes,
            note_overlay,
            archived: FlagSet::archived(store.clone()),
            hidden: FlagSet::hidden(store),
            filters: Filters::default(),
            group_by: options.group_by,
            date_method: options.date_method,
            local_zone: options.local_zone,
            today: options.today,
        }
    }

    pub fn update(&mut self, message: Message) -> Command {
        match message {
            Message::Mount => {
                self.mounted = true;
                self.generation += 1;
                self.files.clear();
                self.seen.clear();
                self.next_page_token = None;
                self.first_page_loaded = false;
                self.load_state = LoadState::Idle;
                self.selection.clear();
                self.view = ViewState::Grid;
                self.note_overlay = self.notes.get_all();
                return self.start_fetch();
            }
            Message::SentinelVisible => {
                if self.load_state == LoadState::Loading {
                    tracing::trace!("Ignoring sentinel while a page is loading");
                    return Command::None;
                }
                return self.start_fetch();
            }
            Message::PageLoaded { generation, result } => {
                if generation != self.generation || !self.mounted {
                    tracing::debug!(generation, current = self.generation, "Discarding stale page");
                    return Command::None;
                }
                return self.apply_page(result);
            }
            Message::Unmount => {
                self.mounted = false;
                self.generation += 1;
                if self.load_state == LoadState::Loading {
                    self.load_state = LoadState::Idle;
                }
                self.measuring.clear();
            }
            Message::SelectFile(id) => {
                if self.seen.contains(&id) {
                    self.view = ViewState::Selected(id);
                }
            }
            Message::ClosePhoto => {
                self.view = ViewState::Grid;
            }
            Message::ToggleSelect(id) => {
                if !self.selection.remove(&id) && self.seen.contains(&id) {
                    self.selection.insert(id);
                }
            }
            Message::ClearSelection => {
                self.selection.clear();
            }
            Message::ArchiveSelected => {
                for id in std::mem::take(&mut self.selection) {
                    self.archived.insert(&id);
                }
            }
            Message::HideSelected => {
                for id in std::mem::take(&mut self.selection) {
                    self.hidden.insert(&id);
                }
            }
            Message::ToggleArchive(id) => {
                let archived = self.archived.toggle(&id);
                tracing::debug!(file_id = %id, archived, "Toggled archive flag");
            }
            Message::ToggleHidden(id) => {
                let hidden = self.hidden.toggle(&id);
                tracing::debug!(file_id = %id, hidden, "Toggled hidden flag");
            }
            Message::ShowHidden(show) => {
                self.filters.show_hidden = show;
            }
            Message::SaveNote(id, text) => {
                let note = self.notes.save(&id, &text);
                self.note_overlay.insert(id, note);
            }
            Message::SetArchiveView(view) => {
                self.filters.archive_view = view;
            }
            Message::SetKindFilter(kind) => {
                self.filters.kind = kind;
            }
            Message::SetOrientationFilter(orientation) => {
                self.filters.orientation = orientation;
            }
            Message::SetDateFilter(filter) => {
                self.filters.date = filter;
            }
            Message::SetDateMethod(method) => {
                self.date_method = method;
            }
            Message::SetGroupBy(group_by) => {
                self.group_by = group_by;
            }
            Message::DimensionsMeasured(id, width, height) => {
                if self.measuring.remove(&id) && self.mounted {
                    self.measured.insert(id, (width, height));
                }
            }
            Message::MeasureFailed(id) => {
                if self.measuring.remove(&id) {
                    tracing::debug!(file_id = %id, "Could not measure thumbnail");
                    self.measure_failed.insert(id);
                }
            }
            Message::DismissError(index) => {
                if index < self.errors.len() {
                    self.errors.remove(index);
                }
            }
        }
        Command::None
    }

    fn start_fetch(&mut self) -> Command {
        if !self.mounted || self.load_state != LoadState::Idle {
            return Command::None;
        }
        if self.first_page_loaded && self.next_page_token.is_none() {
            return Command::None;
        }
        self.load_state = LoadState::Loading;
        Command::FetchPage {
            generation: self.generation,
            page_token: self.next_page_token.clone(),
        }
    }

    fn apply_page(&mut self, result: Result<MediaPage, String>) -> Command {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load media page");
                self.errors.push(format!("Failed to load media: {}", e));
                self.load_state = LoadState::Idle;
                return Command::None;
            }
        };

        let mut to_measure = Vec::new();
        let mut added = 0usize;
        for file in page.files {
            if !is_displayable(&file) || self.seen.contains(&file.id) {
                continue;
            }
            if file.dimensions().is_none()
                && file.kind() == Some(MediaKind::Image)
                && !self.measured.contains_key(&file.id)
                && !self.measure_failed.contains(&file.id)
                && self.measuring.insert(file.id.clone())
            {
                to_measure.push(file.id.clone());
            }
            self.seen.insert(file.id.clone());
            self.files.push(file);
            added += 1;
        }
        tracing::debug!(added, total = self.files.len(), "Appended media page");

        self.first_page_loaded = true;
        self.next_page_token = page.next_page_token.filter(|t| !t.is_empty());
        self.load_state = if self.next_page_token.is_some() {
            LoadState::Idle
        } else {
            LoadState::Exhausted
        };

        if to_measure.is_empty() {
            Command::None
        } else {
            Command::MeasureDimensions(to_measure)
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    pub fn file(&self, id: &str) -> Option<&MediaFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn selection(&self) -> impl Iterator<Item = &str> {
        self.selection.iter().map(String::as_str)
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub fn date_method(&self) -> DateMethod {
        self.date_method
    }

    pub fn note(&self, id: &str) -> &str {
        self.note_overlay
            .get(id)
            .map(|n| n.note.as_str())
            .unwrap_or("")
    }

    pub fn is_archived(&self, id: &str) -> bool {
        self.archived.contains(id)
    }

    pub fn is_hidden(&self, id: &str) -> bool {
        self.hidden.contains(id)
    }

    pub fn orientation_of(&self, file: &MediaFile) -> (Orientation, OrientationSource) {
        orientation::resolve(file, self.measured.get(&file.id).copied())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| self.local_zone.today())
    }

    fn tile(&self, file: &MediaFile) -> Option<Tile> {
        let kind = file.kind()?;
        let (orientation, orientation_source) = self.orientation_of(file);
        Some(Tile {
            file: file.clone(),
            kind,
            orientation,
            orientation_source,
            day: file
                .created_time
                .map(|ts| bucket_day(ts, self.date_method, self.local_zone)),
            archived: self.archived.contains(&file.id),
            hidden: self.hidden.contains(&file.id),
            selected: self.selection.contains(&file.id),
            has_note: !self.note(&file.id).is_empty(),
        })
    }

    /// Files passing the current filters, in listing order.
    pub fn visible_tiles(&self) -> Vec<Tile> {
        let today = self.today();
        self.files
            .iter()
            .filter_map(|f| self.tile(f))
            .filter(|t| {
                let facts = FileFacts {
                    kind: t.kind,
                    archived: t.archived,
                    hidden: t.hidden,
                    orientation: t.orientation,
                    day: t.day,
                };
                self.filters.matches(&facts, today)
            })
            .collect()
    }

    /// Rebuilt from the full file list on every call.
    pub fn panels(&self) -> Panels {
        Panels::build(self.visible_tiles(), self.group_by)
    }
}

/// Entries need an id, and either a preview link or a visual MIME type.
fn is_displayable(file: &MediaFile) -> bool {
    !file.id.is_empty() && (file.thumbnail_link.is_some() || file.kind().is_some())
}
