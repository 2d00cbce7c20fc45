use crate::client::{HttpChatClient, SearchResult};
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;

/// Handle `tablechat search`
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `query` - Search query
/// * `max_results` - Override for `chat.search_max_results`
/// * `json` - Print machine-readable JSON instead of a list
pub async fn run_search(
    config: &Config,
    query: &str,
    max_results: Option<usize>,
    json: bool,
) -> Result<()> {
    let client = HttpChatClient::new(&config.server)?;
    let max_results = max_results.unwrap_or(config.chat.search_max_results);

    let results = client.search(query, max_results).await?;
    tracing::info!(count = results.len(), "Search finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", format_results(query, &results));
    }

    Ok(())
}

/// Human-readable listing of search results
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("{}\n", format!("No results for '{}'", query).yellow());
    }

    let mut out = format!("Results for '{}':\n\n", query.bold());
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, result.title.bold()));
        if !result.url.is_empty() {
            out.push_str(&format!("   {}\n", result.url.cyan()));
        }
        if !result.snippet.is_empty() {
            out.push_str(&format!("   {}\n", result.snippet));
        }
        out.push('\n');
    }
    out
}
