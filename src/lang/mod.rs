//! A small text format for handler maps, so a collector can be configured
//! without writing closures:
//!
//! ```text
//! {
//!   post: select("post.id") {
//!     title: select("post.title")
//!     author: leftJoin("post", "author") & select("author.id") {
//!       name: select("author.name")
//!     }
//!   }
//! }
//! ```

use log::{debug, trace};
use pest::iterators::Pair;
use pest::Parser;

use crate::collector::combinators::{accumulate, compose, left_join, select, Accumulate};
use crate::collector::{HandlerMap, HandlerNode};
use crate::error::CollectError;

#[derive(Parser)]
#[grammar = "lang/grammar.pest"]
struct HandlerParser;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Action {
    Select(Vec<String>),
    LeftJoin(Vec<String>),
    Collect(String, Vec<String>),
}

/// `field: actions { children }`, either part may be missing but not both.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Entry {
    pub field: String,
    pub actions: Vec<Action>,
    pub children: Option<Vec<Entry>>,
}

pub fn parse(source: &str) -> Result<Vec<Entry>, CollectError> {
    let mut pairs = HandlerParser::parse(Rule::program, source).map_err(Box::new)?;

    let entries = match pairs.next().and_then(|program| program.into_inner().next()) {
        Some(map) => build_map(map),
        None => Vec::new(),
    };
    debug!("parsed {} top level handler entries", entries.len());
    Ok(entries)
}

/// Parses and compiles in one go.
pub fn parse_handlers<C>(source: &str) -> Result<HandlerMap<C>, CollectError>
where
    C: Accumulate<String> + Accumulate<Vec<String>> + 'static,
{
    Ok(compile(&parse(source)?))
}

pub fn compile<C>(entries: &[Entry]) -> HandlerMap<C>
where
    C: Accumulate<String> + Accumulate<Vec<String>> + 'static,
{
    let mut map = HandlerMap::new();
    for entry in entries {
        map.insert(&entry.field, compile_entry(entry));
    }
    map
}

fn compile_entry<C>(entry: &Entry) -> HandlerNode<C>
where
    C: Accumulate<String> + Accumulate<Vec<String>> + 'static,
{
    let mut handlers: Vec<HandlerNode<C>> = entry.actions.iter().map(compile_action).collect();
    if let Some(children) = &entry.children {
        handlers.push(compile(children).into());
    }

    if handlers.len() == 1 {
        if let Some(handler) = handlers.pop() {
            return handler;
        }
    }
    compose(handlers)
}

fn compile_action<C>(action: &Action) -> HandlerNode<C>
where
    C: Accumulate<String> + Accumulate<Vec<String>> + 'static,
{
    match action {
        Action::Select(columns) => select(columns.clone()),
        Action::LeftJoin(path) => left_join(path.clone()),
        Action::Collect(key, values) => accumulate::<C, String>(key, values.clone()),
    }
}

fn build_map(pair: Pair<Rule>) -> Vec<Entry> {
    pair.into_inner().map(build_entry).collect()
}

fn build_entry(pair: Pair<Rule>) -> Entry {
    let mut inner = pair.into_inner();
    let field = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
    trace!("entry {}", field);

    let mut entry = Entry {
        field,
        actions: Vec::new(),
        children: None,
    };
    for next in inner {
        match next.as_rule() {
            Rule::actions => entry.actions = next.into_inner().map(build_action).collect(),
            Rule::map => entry.children = Some(build_map(next)),
            rule => unreachable!("Unknown rule '{:?}' in handler entry", rule),
        }
    }
    entry
}

fn build_action(pair: Pair<Rule>) -> Action {
    let rule = pair.as_rule();
    let mut strings = pair.into_inner().map(unquote);
    match rule {
        Rule::select => Action::Select(strings.collect()),
        Rule::left_join => Action::LeftJoin(strings.collect()),
        Rule::collect => {
            let key = strings.next().unwrap_or_default();
            Action::Collect(key, strings.collect())
        }
        rule => unreachable!("Unknown rule '{:?}' in action", rule),
    }
}

fn unquote(pair: Pair<Rule>) -> String {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('t') => output.push('\t'),
            Some(escaped) => output.push(escaped),
            None => {}
        }
    }
    output
}
