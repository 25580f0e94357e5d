//! Headless gallery state for DrivePicz: pagination, filtering, grouping,
//! selection and note overlays, driven by messages.

pub mod dates;
mod driver;
pub mod filter;
pub mod group;
mod measure;
pub mod orientation;
mod source;
mod state;

pub use dates::{DateFilter, DateMethod, LocalZone};
pub use driver::Driver;
pub use filter::{ArchiveView, Filters};
pub use group::{Group, GroupBy, GroupKey, Panels, Tile};
pub use measure::read_dimensions;
pub use orientation::{Orientation, OrientationSource};
pub use source::{HttpMediaSource, MediaSource, SessionInfo, SourceError};
pub use state::{Command, Gallery, GalleryOptions, LoadState, Message, ViewState};
