//! Built-in tools for the Ember assistant.
//!
//! Platform services (calendar, contacts, music, ...) are provided by the
//! host application; the tools here only need the clock and the network.

mod date;
mod refine;
mod search;

use std::sync::Arc;

use runtime::Tool;

pub use date::{DisplayType, TodayDate};
pub use refine::QueryRefine;
pub use search::{SearchDuckduckgo, SearchHit};

/// All built-in tools, sharing one HTTP client.
pub fn builtin_tools(client: reqwest::Client) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(TodayDate::new()),
        Arc::new(QueryRefine::new()),
        Arc::new(SearchDuckduckgo::new(client)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_unique() {
        let tools = builtin_tools(reqwest::Client::new());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["getTodayDate", "queryRefine", "searchDuckduckgo"]);
    }
}
