//! Item content-type classification
//!
//! `content_type` is a free-form classification string, but three values
//! are behaviorally significant to the sync engine: `Note` and `File`
//! drive revision-event emission, and `ItemsKey` items are front-loaded on
//! an initial sync. Everything else round-trips opaquely through
//! [`ContentType::Other`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an item's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// A user-authored note. Eligible for revision snapshots.
    Note,
    /// A stored file reference. Eligible for revision snapshots.
    File,
    /// A key-set item, needed to decrypt other items.
    ItemsKey,
    /// Any other classification string the client uses.
    Other(String),
}

impl ContentType {
    /// The wire string for this content type.
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Note => "Note",
            ContentType::File => "File",
            ContentType::ItemsKey => "ItemsKey",
            ContentType::Other(s) => s.as_str(),
        }
    }

    /// True for the content types that trigger revision-snapshot events.
    pub fn is_revisionable(&self) -> bool {
        matches!(self, ContentType::Note | ContentType::File)
    }

    /// True for `ItemsKey`, the content type front-loaded on initial sync.
    pub fn is_items_key(&self) -> bool {
        matches!(self, ContentType::ItemsKey)
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        match s {
            "Note" => ContentType::Note,
            "File" => ContentType::File,
            "ItemsKey" => ContentType::ItemsKey,
            other => ContentType::Other(other.to_string()),
        }
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        ContentType::from(s.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ContentType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ContentType::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_variants_round_trip_through_str() {
        for variant in [ContentType::Note, ContentType::File, ContentType::ItemsKey] {
            let s = variant.as_str().to_string();
            assert_eq!(ContentType::from(s.as_str()), variant);
        }
    }

    #[test]
    fn unknown_string_becomes_other() {
        let ct = ContentType::from("SN|Theme");
        assert_eq!(ct, ContentType::Other("SN|Theme".to_string()));
        assert_eq!(ct.as_str(), "SN|Theme");
    }

    #[test]
    fn only_note_and_file_are_revisionable() {
        assert!(ContentType::Note.is_revisionable());
        assert!(ContentType::File.is_revisionable());
        assert!(!ContentType::ItemsKey.is_revisionable());
        assert!(!ContentType::Other("Tag".into()).is_revisionable());
    }

    #[test]
    fn only_items_key_is_items_key() {
        assert!(ContentType::ItemsKey.is_items_key());
        assert!(!ContentType::Note.is_items_key());
    }

    #[test]
    fn json_round_trip() {
        let ct = ContentType::Note;
        let json = serde_json::to_string(&ct).unwrap();
        assert_eq!(json, "\"Note\"");
        let back: ContentType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ct);
    }
}
