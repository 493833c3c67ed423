use async_trait::async_trait;
use plaza_core::{RoomBounds, RoomId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("room '{0}' does not exist")]
    NotFound(RoomId),
    #[error("room directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the external room metadata store.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn lookup(&self, room_id: &RoomId) -> Result<RoomBounds, DirectoryError>;
}

#[derive(Debug, Deserialize)]
struct RoomsFile {
    #[serde(default)]
    rooms: Vec<RoomEntry>,
}

#[derive(Debug, Deserialize)]
struct RoomEntry {
    id: String,
    width: u32,
    height: u32,
}

/// Fixed set of rooms, typically loaded once from a TOML file at startup.
#[derive(Debug, Default, Clone)]
pub struct StaticRoomDirectory {
    rooms: HashMap<RoomId, RoomBounds>,
}

impl StaticRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_room(mut self, room_id: impl Into<RoomId>, bounds: RoomBounds) -> Self {
        self.insert(room_id, bounds);
        self
    }

    pub fn insert(&mut self, room_id: impl Into<RoomId>, bounds: RoomBounds) {
        self.rooms.insert(room_id.into(), bounds);
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DirectoryError> {
        let file: RoomsFile =
            toml::from_str(text).map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let mut directory = Self::new();
        for entry in file.rooms {
            if entry.width == 0 || entry.height == 0 {
                return Err(DirectoryError::Unavailable(format!(
                    "room '{}' has an empty grid",
                    entry.id
                )));
            }
            if i32::try_from(entry.width).is_err() || i32::try_from(entry.height).is_err() {
                return Err(DirectoryError::Unavailable(format!(
                    "room '{}' exceeds the addressable grid",
                    entry.id
                )));
            }
            directory.insert(entry.id, RoomBounds::new(entry.width, entry.height));
        }
        Ok(directory)
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomDirectory for StaticRoomDirectory {
    async fn lookup(&self, room_id: &RoomId) -> Result<RoomBounds, DirectoryError> {
        self.rooms
            .get(room_id)
            .copied()
            .ok_or_else(|| DirectoryError::NotFound(room_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_rooms_file() {
        let directory = StaticRoomDirectory::from_toml_str(
            r#"
            [[rooms]]
            id = "r1"
            width = 20
            height = 15

            [[rooms]]
            id = "lobby"
            width = 8
            height = 8
            "#,
        )
        .unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.lookup(&RoomId::from("r1")).await,
            Ok(RoomBounds::new(20, 15))
        );
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let directory = StaticRoomDirectory::new();
        let res = directory.lookup(&RoomId::from("nope")).await;
        assert_eq!(res, Err(DirectoryError::NotFound(RoomId::from("nope"))));
    }

    #[test]
    fn zero_sized_room_is_refused() {
        let res = StaticRoomDirectory::from_toml_str(
            r#"
            [[rooms]]
            id = "flat"
            width = 0
            height = 3
            "#,
        );
        assert!(matches!(res, Err(DirectoryError::Unavailable(_))));
    }

    #[test]
    fn room_beyond_coordinate_range_is_refused() {
        let res = StaticRoomDirectory::from_toml_str(
            r#"
            [[rooms]]
            id = "vast"
            width = 3000000000
            height = 3
            "#,
        );
        assert!(matches!(res, Err(DirectoryError::Unavailable(_))));
    }
}
