use crate::orientation::{Orientation, OrientationSource};
use api_client::{MediaFile, MediaKind};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    None,
    Orientation,
    Day,
}

impl std::str::FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(GroupBy::None),
            "orientation" => Ok(GroupBy::Orientation),
            "day" | "date" => Ok(GroupBy::Day),
            other => Err(format!("unknown grouping: {}", other)),
        }
    }
}

/// A file as the grid renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub file: MediaFile,
    pub kind: MediaKind,
    pub orientation: Orientation,
    pub orientation_source: OrientationSource,
    pub day: Option<NaiveDate>,
    pub archived: bool,
    pub hidden: bool,
    pub selected: bool,
    pub has_note: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    All,
    Orientation(Orientation),
    Day(Option<NaiveDate>),
}

impl GroupKey {
    pub fn label(&self) -> String {
        match self {
            GroupKey::All => "All".to_string(),
            GroupKey::Orientation(o) => o.to_string(),
            GroupKey::Day(Some(day)) => day.format("%Y-%m-%d").to_string(),
            GroupKey::Day(None) => "Unknown date".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub tiles: Vec<Tile>,
}

/// Images and videos render as separate lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panels {
    pub images: Vec<Group>,
    pub videos: Vec<Group>,
}

impl Panels {
    pub fn build(tiles: Vec<Tile>, by: GroupBy) -> Self {
        let (images, videos): (Vec<Tile>, Vec<Tile>) =
            tiles.into_iter().partition(|t| t.kind == MediaKind::Image);
        Panels {
            images: group_tiles(images, by),
            videos: group_tiles(videos, by),
        }
    }

    pub fn len(&self) -> usize {
        self.images
            .iter()
            .chain(self.videos.iter())
            .map(|g| g.tiles.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition tiles, keeping their incoming order inside each group. Day
/// groups come newest first with undated files last.
pub fn group_tiles(tiles: Vec<Tile>, by: GroupBy) -> Vec<Group> {
    if tiles.is_empty() {
        return Vec::new();
    }
    match by {
        GroupBy::None => vec![Group {
            key: GroupKey::All,
            tiles,
        }],
        GroupBy::Orientation => {
            let mut buckets: BTreeMap<Orientation, Vec<Tile>> = BTreeMap::new();
            for tile in tiles {
                buckets.entry(tile.orientation).or_default().push(tile);
            }
            Orientation::ALL
                .iter()
                .filter_map(|o| {
                    buckets.remove(o).map(|tiles| Group {
                        key: GroupKey::Orientation(*o),
                        tiles,
                    })
                })
                .collect()
        }
        GroupBy::Day => {
            let mut dated: BTreeMap<NaiveDate, Vec<Tile>> = BTreeMap::new();
            let mut undated = Vec::new();
            for tile in tiles {
                match tile.day {
                    Some(day) => dated.entry(day).or_default().push(tile),
                    None => undated.push(tile),
                }
            }
            let mut groups: Vec<Group> = dated
                .into_iter()
                .rev()
                .map(|(day, tiles)| Group {
                    key: GroupKey::Day(Some(day)),
                    tiles,
                })
                .collect();
            if !undated.is_empty() {
                groups.push(Group {
                    key: GroupKey::Day(None),
                    tiles: undated,
                });
            }
            groups
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, kind: MediaKind, orientation: Orientation, day: Option<(i32, u32, u32)>) -> Tile {
        Tile {
            file: MediaFile {
                id: id.into(),
                name: format!("{}.jpg", id),
                mime_type: "image/jpeg".into(),
                thumbnail_link: None,
                web_view_link: None,
                size: None,
                created_time: None,
                width: None,
                height: None,
            },
            kind,
            orientation,
            orientation_source: OrientationSource::Default,
            day: day.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            archived: false,
            hidden: false,
            selected: false,
            has_note: false,
        }
    }

    #[test]
    fn test_day_groups_newest_first() {
        let tiles = vec![
            tile("a", MediaKind::Image, Orientation::Portrait, Some((2024, 3, 1))),
            tile("b", MediaKind::Image, Orientation::Portrait, None),
            tile("c", MediaKind::Image, Orientation::Square, Some((2024, 3, 2))),
            tile("d", MediaKind::Image, Orientation::Square, Some((2024, 3, 1))),
        ];
        let groups = group_tiles(tiles, GroupBy::Day);
        let labels: Vec<String> = groups.iter().map(|g| g.key.label()).collect();
        assert_eq!(labels, vec!["2024-03-02", "2024-03-01", "Unknown date"]);
        let ids: Vec<&str> = groups[1].tiles.iter().map(|t| t.file.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_panels_split_by_kind() {
        let tiles = vec![
            tile("a", MediaKind::Image, Orientation::Landscape, None),
            tile("v", MediaKind::Video, Orientation::Landscape, None),
            tile("b", MediaKind::Image, Orientation::Portrait, None),
        ];
        let panels = Panels::build(tiles, GroupBy::Orientation);
        assert_eq!(panels.len(), 3);
        assert_eq!(panels.images.len(), 2);
        assert_eq!(panels.images[0].key, GroupKey::Orientation(Orientation::Portrait));
        assert_eq!(panels.videos[0].tiles[0].file.id, "v");
        assert!(Panels::build(Vec::new(), GroupBy::None).is_empty());
    }
}
