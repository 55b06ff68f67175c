//! Tool-search request shapes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Search tools exposed by the tools backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTool {
    WebSearch,
    KeywordSearch,
}

impl SearchTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTool::WebSearch => "web_search",
            SearchTool::KeywordSearch => "keyword_search",
        }
    }
}

impl fmt::Display for SearchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        let tool: SearchTool = serde_json::from_value(serde_json::json!("web_search")).unwrap();
        assert_eq!(tool, SearchTool::WebSearch);
        assert_eq!(tool.to_string(), "web_search");
        assert_eq!(
            serde_json::to_value(SearchTool::KeywordSearch).unwrap(),
            serde_json::json!("keyword_search")
        );
        assert!(serde_json::from_value::<SearchTool>(serde_json::json!("shell")).is_err());
    }
}
