//! Ready-made handlers for the common case of collecting column names and
//! joins into the context.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::collector::HandlerNode;
use crate::error::CollectError;

pub const SELECT: &str = "select";
pub const LEFT_JOIN: &str = "leftJoin";

/// A context that keeps ordered lists of `V` under string keys.
pub trait Accumulate<V> {
    /// The list stored under `key`, created empty if missing. `None` when the
    /// context has no place for `key`.
    fn accumulator(&mut self, key: &str) -> Option<&mut Vec<V>>;
}

impl<V> Accumulate<V> for HashMap<String, Vec<V>> {
    fn accumulator(&mut self, key: &str) -> Option<&mut Vec<V>> {
        Some(self.entry(key.to_string()).or_default())
    }
}

impl<V> Accumulate<V> for BTreeMap<String, Vec<V>> {
    fn accumulator(&mut self, key: &str) -> Option<&mut Vec<V>> {
        Some(self.entry(key.to_string()).or_default())
    }
}

/// Selected columns and joined relations of one query. Any other key
/// collected with [`accumulate`] lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectContext {
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub left_join: Vec<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Vec<String>>,
}

impl Accumulate<String> for CollectContext {
    fn accumulator(&mut self, key: &str) -> Option<&mut Vec<String>> {
        match key {
            SELECT => Some(&mut self.select),
            LEFT_JOIN => None,
            _ => Some(self.extra.entry(key.to_string()).or_default()),
        }
    }
}

impl Accumulate<Vec<String>> for CollectContext {
    fn accumulator(&mut self, key: &str) -> Option<&mut Vec<Vec<String>>> {
        match key {
            LEFT_JOIN => Some(&mut self.left_join),
            _ => None,
        }
    }
}

/// Leaf handler appending `values` to the list under `key`.
pub fn accumulate<C, V>(key: &str, values: impl IntoIterator<Item = V>) -> HandlerNode<C>
where
    C: Accumulate<V> + 'static,
    V: Clone + Send + Sync + 'static,
{
    let key = key.to_string();
    let values: Vec<V> = values.into_iter().collect();
    HandlerNode::callable(move |context: &mut C| {
        let target = context
            .accumulator(&key)
            .ok_or_else(|| CollectError::UnknownAccumulator(key.clone()))?;
        target.extend(values.iter().cloned());
        Ok(None)
    })
}

pub fn select<C, S>(columns: impl IntoIterator<Item = S>) -> HandlerNode<C>
where
    C: Accumulate<String> + 'static,
    S: Into<String>,
{
    accumulate(SELECT, columns.into_iter().map(Into::into))
}

/// Appends one join path, e.g. `["post", "author"]`.
pub fn left_join<C, S>(path: impl IntoIterator<Item = S>) -> HandlerNode<C>
where
    C: Accumulate<Vec<String>> + 'static,
    S: Into<String>,
{
    let path: Vec<String> = path.into_iter().map(Into::into).collect();
    accumulate(LEFT_JOIN, [path])
}

/// Runs `handlers` in order as one handler. Maps pass through unchanged and
/// only the last entry decides what the walk descends into.
pub fn compose<C: 'static>(handlers: impl IntoIterator<Item = HandlerNode<C>>) -> HandlerNode<C> {
    let handlers: Vec<HandlerNode<C>> = handlers.into_iter().collect();
    HandlerNode::callable(move |context: &mut C| {
        let mut last = None;
        for handler in &handlers {
            last = handler.resolve(context)?;
        }
        Ok(last)
    })
}
