//! Configuration options for Markdown serialization

use serde::Deserialize;

/// Options for Markdown serialization
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    /// Render lists without blank lines between items, unless a list sets
    /// its own `tight` attribute
    pub tight_lists: bool,

    /// Bullet list marker
    pub bullet_list_marker: char,

    /// Emphasis delimiter
    pub em_delimiter: String,

    /// Strong delimiter
    pub strong_delimiter: String,

    /// Strikethrough delimiter
    pub strike_delimiter: String,

    /// Horizontal rule string
    pub hr: String,

    /// Additional characters to backslash-escape in text
    pub escape_extra_characters: String,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            tight_lists: true,
            bullet_list_marker: '-',
            em_delimiter: "_".to_string(),
            strong_delimiter: "**".to_string(),
            strike_delimiter: "~~".to_string(),
            hr: "---".to_string(),
            escape_extra_characters: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let options: SerializerOptions =
            serde_json::from_str(r#"{ "tight_lists": false, "bullet_list_marker": "*" }"#)
                .unwrap();
        assert!(!options.tight_lists);
        assert_eq!(options.bullet_list_marker, '*');
        assert_eq!(options.hr, "---");
    }
}
