//! A named media room

use crate::media::MediaRoom;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A room as held by the registry
///
/// Created once per name on first join and kept until the registry drops.
pub struct Room {
    name: String,
    media: Arc<dyn MediaRoom>,
    created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: &str, media: Arc<dyn MediaRoom>) -> Self {
        Self {
            name: name.to_string(),
            media,
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media-routing side of the room
    pub fn media(&self) -> &Arc<dyn MediaRoom> {
        &self.media
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .finish()
    }
}
