//! `opsboard list`: fetch a collection through a list view, optionally
//! keeping the view open and editing its query from stdin.

use clap::Args;
use opsboard_core::{
    ApiClient, ListSource, ListState, ListView, QueryPatch, Resource, ORDERING_KEY, SEARCH_KEY,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::output::print_state;
use super::{parse_filter, CommandError, OutputFormat, QueryArgs};
use crate::config::Config;

const WATCH_HELP: &str = "commands: search <text> | filter <key>=<value> | clear <key> | order <token> | page <n> | next | prev | refresh | quit";

/// List a collection
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Collection name, e.g. lines, orders, chemistry-tasks
    resource: Resource,

    #[command(flatten)]
    view: ViewArgs,
}

impl ListCommand {
    pub async fn run(&self, client: &ApiClient, config: &Config) -> Result<(), CommandError> {
        tracing::debug!(resource = %self.resource, "opening list view");
        self.view
            .open(client.resource(self.resource).source(), Some(config.page_size.value))
            .await
    }
}

/// Query, output and watch options shared by commands that show a list view.
#[derive(Debug, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Keep the list open and read query edits from stdin
    #[arg(long)]
    watch: bool,
}

impl ViewArgs {
    /// Opens a list view over `source`. `default_page_size` applies when no
    /// `--page-size` is given; `None` leaves it to the operation.
    pub async fn open(
        &self,
        source: impl ListSource,
        default_page_size: Option<u32>,
    ) -> Result<(), CommandError> {
        let query = self.query.to_query(default_page_size);
        tracing::debug!(query = %query, watch = self.watch, "list view query");
        present(ListView::spawn(source, query), self.format, self.watch).await
    }
}

/// Prints the first settled state of `view`, or with `watch` keeps it open
/// and applies query edits read from stdin until `quit` or end of input.
async fn present(view: ListView, format: OutputFormat, watch: bool) -> Result<(), CommandError> {
    if watch {
        return follow(view, format).await;
    }

    let state = view
        .wait_until(|state| !state.loading)
        .await
        .ok_or(CommandError::ViewClosed)?;
    view.teardown().await;

    match state.error {
        Some(error) => Err(CommandError::Api(error)),
        None => print_state(&state, format),
    }
}

async fn follow(view: ListView, format: OutputFormat) -> Result<(), CommandError> {
    let mut states = view.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("{}", WATCH_HELP);

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if !state.loading {
                    print_state(&state, format)?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match WatchInput::parse(&line) {
                    Ok(WatchInput::Quit) => break,
                    Ok(input) => apply(&view, input),
                    Err(message) => eprintln!("{}\n{}", message, WATCH_HELP),
                }
            }
        }
    }

    view.teardown().await;
    Ok(())
}

/// One line typed while watching a list.
#[derive(Debug, Clone, PartialEq)]
enum WatchInput {
    Search(String),
    Filter(String, String),
    Clear(String),
    Order(String),
    Page(u32),
    Next,
    Prev,
    Refresh,
    Quit,
}

impl WatchInput {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match word {
            "search" | "s" => Ok(WatchInput::Search(rest.to_string())),
            "filter" | "f" => {
                let (key, value) = parse_filter(rest)?;
                Ok(WatchInput::Filter(key, value))
            }
            "clear" if !rest.is_empty() => Ok(WatchInput::Clear(rest.to_string())),
            "order" | "o" => Ok(WatchInput::Order(rest.to_string())),
            "page" | "p" => rest
                .parse()
                .ok()
                .filter(|page| *page > 0)
                .map(WatchInput::Page)
                .ok_or_else(|| format!("invalid page '{}'", rest)),
            "next" | "n" => Ok(WatchInput::Next),
            "prev" => Ok(WatchInput::Prev),
            "refresh" | "r" => Ok(WatchInput::Refresh),
            "quit" | "q" | "exit" => Ok(WatchInput::Quit),
            _ => Err(format!("unknown command '{}'", line)),
        }
    }
}

fn apply(view: &ListView, input: WatchInput) {
    match input {
        WatchInput::Search(text) => view.patch(QueryPatch::new().set(SEARCH_KEY, text)),
        WatchInput::Filter(key, value) => view.patch(QueryPatch::new().set(key, value)),
        WatchInput::Clear(key) => view.patch(QueryPatch::new().clear(key)),
        WatchInput::Order(token) => view.patch(QueryPatch::new().set(ORDERING_KEY, token)),
        WatchInput::Page(page) => view.set_page(page),
        WatchInput::Next | WatchInput::Prev => match step_page(&view.state(), input == WatchInput::Next) {
            Some(page) => view.set_page(page),
            None => eprintln!("no more pages"),
        },
        WatchInput::Refresh => view.refetch(),
        WatchInput::Quit => {}
    }
}

/// Neighbouring page, bounded by the last reported metadata.
fn step_page(state: &ListState, forward: bool) -> Option<u32> {
    let current = state.query.page().unwrap_or(1);
    let meta = state.meta();
    let target = if forward {
        match meta {
            Some(meta) if current >= meta.total_pages => return None,
            None if state.data.is_some() => return None,
            _ => current + 1,
        }
    } else if current > 1 {
        current - 1
    } else {
        return None;
    };
    u32::try_from(target).ok()
}
