//! Book content files (`books/*.json`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZbrsBook {
    pub book: BookInfo,
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BookMetadata>,
}

impl ZbrsBook {
    /// Number of verses actually present across all chapters.
    pub fn actual_verse_count(&self) -> usize {
        self.chapters.iter().map(|c| c.verses.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Canonical position of the book (Genesis = 1).
    pub order: u32,
    pub testament: Testament,
    pub chapters_count: u32,
    pub verses_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Testament {
    Old,
    New,
}

impl Testament {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Old => "old",
            Self::New => "new",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u32,
    pub verses: Vec<Verse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<Footnote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cross_references: Vec<CrossReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub study_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    #[serde(default)]
    pub marker: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Target reference, e.g. `"John 1:1"`.
    pub reference: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub outline: Vec<Value>,
    #[serde(default)]
    pub themes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_book_with_optional_fields() {
        let raw = json!({
            "book": {
                "id": "jhn", "name": "John", "abbreviation": "Jn", "order": 43,
                "testament": "new", "chapters_count": 1, "verses_count": 2
            },
            "chapters": [{
                "number": 1,
                "verses": [
                    { "number": 1, "text": "In the beginning was the Word",
                      "cross_references": [{ "reference": "Gen 1:1" }] },
                    { "number": 2, "text": "The same was in the beginning with God.",
                      "footnotes": [{ "marker": "a", "text": "Or: with the Father" }] }
                ]
            }],
            "metadata": { "themes": ["incarnation"] }
        });

        let book: ZbrsBook = serde_json::from_value(raw).unwrap();
        assert_eq!(book.book.testament, Testament::New);
        assert_eq!(book.actual_verse_count(), 2);
        assert_eq!(book.chapters[0].verses[0].cross_references.len(), 1);
        assert_eq!(book.chapters[0].verses[1].footnotes[0].marker.as_deref(), Some("a"));
        assert_eq!(book.metadata.unwrap().themes, vec!["incarnation".to_string()]);
    }
}
