use api_client::{MediaKind, DEFAULT_PAGE_SIZE};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use gallery::{
    ArchiveView, DateFilter, DateMethod, Driver, Gallery, GalleryOptions, Group, GroupBy,
    HttpMediaSource, LoadState, Message, Orientation, Tile,
};
use std::path::PathBuf;
use std::time::Duration;
use store::{FlagSet, LastLogin, NoteStore, SqliteStore};

#[path = "../config.rs"]
mod config;
#[path = "../logging.rs"]
mod logging;

#[derive(Parser)]
#[command(
    name = "gallery_cli",
    author,
    version,
    about = "DrivePicz terminal gallery"
)]
struct Cli {
    /// Base URL of the DrivePicz server
    #[arg(long)]
    server: Option<String>,
    /// Value of the session cookie issued after signing in
    #[arg(long, env = "DRIVEPICZ_SESSION", hide_env_values = true)]
    session: Option<String>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Directory holding local notes and flags
    #[arg(long)]
    data_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
        }
    }
}

fn parse_date_filter(s: &str) -> Result<DateFilter, String> {
    DateFilter::parse(s).ok_or_else(|| format!("invalid date filter: {}", s))
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signed-in user and local state
    Status,
    /// Load media pages and print them grouped
    Browse {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// active, archived or all
        #[arg(long, default_value = "active")]
        view: ArchiveView,
        /// Include hidden files
        #[arg(long)]
        show_hidden: bool,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        /// portrait, landscape or square
        #[arg(long)]
        orientation: Option<Orientation>,
        /// this-month, last-month, this-year, last-year, YYYY-MM-DD or a START..END range
        #[arg(long, value_parser = parse_date_filter)]
        date: Option<DateFilter>,
        /// local, utc or smart
        #[arg(long, default_value = "local")]
        date_method: DateMethod,
        /// none, orientation or day
        #[arg(long, default_value = "day")]
        group_by: GroupBy,
    },
    /// Read and write notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Move a file to the archive
    Archive { id: String },
    /// Bring a file back from the archive
    Unarchive { id: String },
    /// Hide a file from the gallery
    Hide { id: String },
    /// Show a hidden file again
    Unhide { id: String },
    /// Print the URL that starts sign-in
    LoginUrl,
}

#[derive(Subcommand)]
enum NoteAction {
    /// Attach a note to a file, replacing any previous one
    Set { id: String, text: String },
    /// Print the note for a file
    Get { id: String },
    /// Print every note
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        data_path: cli.data_path.clone(),
        server_url: cli.server.clone(),
        ..config::AppConfigOverrides::default()
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);
    let _guard = logging::init(
        &cfg.log_level,
        &cfg.data_path,
        "gallery_cli.log",
        logging::Console::Stderr,
    )?;

    let store = SqliteStore::open(&cfg.local_store_path())?;
    let source = HttpMediaSource::with_timeout(
        &cfg.server_url,
        cli.session.clone(),
        Duration::from_secs(cfg.request_timeout_secs),
    );

    match cli.command {
        Commands::Status => {
            match source.session().await {
                Ok(info) => match info.user {
                    Some(user) => {
                        let who = user.email.or(user.name).unwrap_or_else(|| "unknown".into());
                        println!("Signed in as {}", who);
                        if let Some(expires) = info.expires {
                            println!("Session expires: {}", expires);
                        }
                        let last_login = LastLogin::new(store.clone());
                        let now = Utc::now();
                        if last_login.should_auto_redirect(now, true) {
                            println!("Recent sign-in: gallery opens directly");
                        }
                        last_login.record(now);
                    }
                    None => println!("Not signed in"),
                },
                Err(e) => println!("Server unavailable: {}", e),
            }
            let notes = NoteStore::new(store.clone()).get_all().len();
            let archived = FlagSet::archived(store.clone()).len();
            let hidden = FlagSet::hidden(store).len();
            println!("Notes: {}", notes);
            println!("Archived: {}", archived);
            println!("Hidden: {}", hidden);
        }
        Commands::Browse {
            pages,
            view,
            show_hidden,
            kind,
            orientation,
            date,
            date_method,
            group_by,
        } => {
            let options = GalleryOptions {
                date_method,
                group_by,
                ..GalleryOptions::default()
            };
            let mut gallery = Gallery::new(store, options);
            gallery.update(Message::SetArchiveView(view));
            gallery.update(Message::ShowHidden(show_hidden));
            gallery.update(Message::SetKindFilter(kind.map(MediaKind::from)));
            gallery.update(Message::SetOrientationFilter(orientation));
            gallery.update(Message::SetDateFilter(date));

            let driver = Driver::new(source);
            driver.dispatch(&mut gallery, Message::Mount).await;
            let mut loaded = 1;
            while loaded < pages && gallery.load_state() == LoadState::Idle && gallery.errors().is_empty() {
                driver.dispatch(&mut gallery, Message::SentinelVisible).await;
                loaded += 1;
            }
            tracing::debug!(loaded, page_size = DEFAULT_PAGE_SIZE, "Browse finished loading");

            let panels = gallery.panels();
            print_panel("Images", &panels.images, &gallery);
            print_panel("Videos", &panels.videos, &gallery);
            if gallery.load_state() == LoadState::Exhausted {
                println!("End of library");
            }

            if !gallery.errors().is_empty() {
                for banner in gallery.errors() {
                    eprintln!("{}", banner);
                }
                return Err(gallery.errors().join("; ").into());
            }
        }
        Commands::Note { action } => {
            let notes = NoteStore::new(store);
            match action {
                NoteAction::Set { id, text } => {
                    notes.save(&id, &text);
                    println!("Note saved for {}", id);
                }
                NoteAction::Get { id } => {
                    let text = notes.get(&id);
                    if text.is_empty() {
                        println!("No note for {}", id);
                    } else {
                        println!("{}", text);
                    }
                }
                NoteAction::List => {
                    let mut all: Vec<_> = notes.get_all().into_values().collect();
                    all.sort_by(|a, b| a.id.cmp(&b.id));
                    if all.is_empty() {
                        println!("No notes");
                    }
                    for note in all {
                        println!("{}\t{}", note.id, note.note);
                    }
                }
            }
        }
        Commands::Archive { id } => {
            FlagSet::archived(store).insert(&id);
            println!("Archived {}", id);
        }
        Commands::Unarchive { id } => {
            FlagSet::archived(store).remove(&id);
            println!("Unarchived {}", id);
        }
        Commands::Hide { id } => {
            FlagSet::hidden(store).insert(&id);
            println!("Hidden {}", id);
        }
        Commands::Unhide { id } => {
            FlagSet::hidden(store).remove(&id);
            println!("Unhidden {}", id);
        }
        Commands::LoginUrl => {
            let mut url = url::Url::parse(&cfg.server_url)?.join("/api/auth/signin")?;
            url.query_pairs_mut().append_pair("callbackUrl", "/dashboard");
            println!("{}", url);
        }
    }

    Ok(())
}

fn print_panel(title: &str, groups: &[Group], gallery: &Gallery<SqliteStore>) {
    let count: usize = groups.iter().map(|g| g.tiles.len()).sum();
    println!("{} ({})", title, count);
    for group in groups {
        println!("  == {} ==", group.key.label());
        for tile in &group.tiles {
            println!("    {}", tile_line(tile, gallery.note(&tile.file.id)));
        }
    }
}

fn tile_line(tile: &Tile, note: &str) -> String {
    let mut line = format!(
        "{}  {}  {} ({:?})",
        tile.file.id, tile.file.name, tile.orientation, tile.orientation_source
    );
    if let Some(size) = tile.file.formatted_size() {
        line.push_str(&format!("  {}", size));
    }
    if tile.archived {
        line.push_str("  [archived]");
    }
    if tile.hidden {
        line.push_str("  [hidden]");
    }
    if tile.kind == MediaKind::Video {
        if let Some(link) = &tile.file.web_view_link {
            line.push_str(&format!("  {}", link));
        }
    }
    if !note.is_empty() {
        line.push_str(&format!("  note: {}", note));
    }
    line
}
