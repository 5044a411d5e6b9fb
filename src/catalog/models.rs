use serde::{Deserialize, Serialize};
use tracing::debug;

/// Free-form attributes carried along with a track (web_url, genre, ...).
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Attribute names that are either columns of their own or added on read.
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "title",
    "artist",
    "year",
    "img_url",
    "email",
    "musicId",
    "subscribed_at",
];

/// Removes attributes that would shadow a column or a field added on read.
pub(crate) fn strip_reserved(attributes: &mut Attributes, title: &str) {
    for reserved in RESERVED_ATTRIBUTES {
        if attributes.remove(*reserved).is_some() {
            debug!("Dropping attribute {} of '{}'", reserved, title);
        }
    }
}

/// Composite identity of a track: `(title, artist)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub title: String,
    pub artist: String,
}

impl TrackKey {
    pub fn new<T: Into<String>, A: Into<String>>(title: T, artist: A) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Legacy `title_artist` identifier. Display only: two different keys can
    /// render to the same string, so it never acts as a key.
    pub fn music_id(&self) -> String {
        format!("{}_{}", self.title, self.artist)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub artist: String,
    pub year: i64,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl CatalogEntry {
    pub fn new<T: Into<String>, A: Into<String>>(title: T, artist: A, year: i64) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            year,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<serde_json::Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(self.title.clone(), self.artist.clone())
    }
}

/// A catalog entry together with its cover image reference.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedEntry {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub img_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn music_id_joins_title_and_artist() {
        let key = TrackKey::new("Discovery", "Daft Punk");
        assert_eq!(key.music_id(), "Discovery_Daft Punk");
    }

    #[test]
    fn music_id_collisions_do_not_make_keys_equal() {
        let a = TrackKey::new("A_B", "C");
        let b = TrackKey::new("A", "B_C");
        assert_eq!(a.music_id(), b.music_id());
        assert_ne!(a, b);
    }

    #[test]
    fn resolved_entry_serializes_flat() {
        let resolved = ResolvedEntry {
            entry: CatalogEntry::new("Discovery", "Daft Punk", 2001)
                .with_attribute("web_url", "https://example.com/discovery"),
            img_url: "https://img/DaftPunk.jpg".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            json!({
                "title": "Discovery",
                "artist": "Daft Punk",
                "year": 2001,
                "web_url": "https://example.com/discovery",
                "img_url": "https://img/DaftPunk.jpg",
            })
        );
    }
}
