use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::fields::{ExtractOptions, FieldTree};

pub mod combinators;

/// What a callable handler hands back: `None` ends the walk below its field,
/// a map continues into the requested subfields.
pub type HandlerResult<C> = anyhow::Result<Option<HandlerMap<C>>>;

type Callable<C> = Arc<dyn Fn(&mut C) -> HandlerResult<C> + Send + Sync>;

/// A field handler: either an action run against the context, or a map of
/// handlers for the field's own subfields.
pub enum HandlerNode<C> {
    Callable(Callable<C>),
    Map(HandlerMap<C>),
}

impl<C> HandlerNode<C> {
    pub fn callable<F>(f: F) -> Self
    where
        C: 'static,
        F: Fn(&mut C) -> HandlerResult<C> + Send + Sync + 'static,
    {
        HandlerNode::Callable(Arc::new(f))
    }

    /// Infallible action with no subfields to descend into.
    pub fn leaf<F>(f: F) -> Self
    where
        C: 'static,
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        HandlerNode::callable(move |context: &mut C| {
            f(context);
            Ok(None)
        })
    }

    /// Turns the node into the map to descend with, running it if callable.
    pub fn resolve(&self, context: &mut C) -> HandlerResult<C> {
        match self {
            HandlerNode::Callable(f) => f(context),
            HandlerNode::Map(map) => Ok(Some(map.clone())),
        }
    }
}

impl<C> Clone for HandlerNode<C> {
    fn clone(&self) -> Self {
        match self {
            HandlerNode::Callable(f) => HandlerNode::Callable(Arc::clone(f)),
            HandlerNode::Map(map) => HandlerNode::Map(map.clone()),
        }
    }
}

impl<C> fmt::Debug for HandlerNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerNode::Callable(_) => write!(f, "Callable"),
            HandlerNode::Map(map) => map.fmt(f),
        }
    }
}

impl<C> From<HandlerMap<C>> for HandlerNode<C> {
    fn from(map: HandlerMap<C>) -> Self {
        HandlerNode::Map(map)
    }
}

/// Handlers keyed by field name, kept in the order they were added. Built once
/// and shared between queries. Cloning is cheap, the entries are shared.
pub struct HandlerMap<C> {
    handlers: Arc<IndexMap<String, HandlerNode<C>>>,
}

impl<C> HandlerMap<C> {
    pub fn new() -> Self {
        HandlerMap {
            handlers: Arc::new(IndexMap::new()),
        }
    }

    pub fn field(mut self, name: &str, handler: impl Into<HandlerNode<C>>) -> Self {
        self.insert(name, handler);
        self
    }

    /// Replacing an existing field keeps its original position.
    pub fn insert(&mut self, name: &str, handler: impl Into<HandlerNode<C>>) {
        Arc::make_mut(&mut self.handlers).insert(name.to_string(), handler.into());
    }

    pub fn get(&self, name: &str) -> Option<&HandlerNode<C>> {
        self.handlers.get(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HandlerNode<C>)> {
        self.handlers.iter().map(|(name, node)| (name.as_str(), node))
    }
}

impl<C> Default for HandlerMap<C> {
    fn default() -> Self {
        HandlerMap::new()
    }
}

impl<C> Clone for HandlerMap<C> {
    fn clone(&self) -> Self {
        HandlerMap {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<C> fmt::Debug for HandlerMap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.handlers.iter()).finish()
    }
}

/// Runs every handler in `node` whose field path appears in `fields`, parents
/// before children and siblings in the order they were added, and hands the
/// context back.
///
/// Requested fields without a handler and handlers for fields that were not
/// requested are both skipped. The first handler error is returned as is;
/// whatever earlier handlers wrote to the context stays there.
pub fn dispatch<'c, C>(
    context: &'c mut C,
    node: &HandlerNode<C>,
    fields: &FieldTree,
) -> anyhow::Result<&'c mut C> {
    dispatch_inner(context, node, fields)?;
    Ok(context)
}

fn dispatch_inner<C>(context: &mut C, node: &HandlerNode<C>, fields: &FieldTree) -> anyhow::Result<()> {
    let Some(map) = node.resolve(context)? else { return Ok(()) };

    for (name, handler) in map.iter() {
        match fields.get(name) {
            Some(subfields) => {
                trace!("field '{}' requested, running handler", name);
                dispatch_inner(context, handler, subfields)?;
            }
            None => trace!("field '{}' not requested", name),
        }
    }
    Ok(())
}

/// A root handler bound once, applied to every incoming query.
pub struct Collector<C> {
    handler: HandlerNode<C>,
}

impl<C> Clone for Collector<C> {
    fn clone(&self) -> Self {
        Collector {
            handler: self.handler.clone(),
        }
    }
}

impl<C> fmt::Debug for Collector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector").field("handler", &self.handler).finish()
    }
}

impl<C> Collector<C> {
    pub fn new(handler: impl Into<HandlerNode<C>>) -> Self {
        Collector {
            handler: handler.into(),
        }
    }

    pub fn collect<'c>(&self, context: &'c mut C, fields: &FieldTree) -> anyhow::Result<&'c mut C> {
        debug!("collecting {} requested root fields", fields.len());
        dispatch(context, &self.handler, fields)
    }

    /// Extracts the requested fields from a GraphQL document, then collects.
    pub fn collect_document<'c>(
        &self,
        context: &'c mut C,
        source: &str,
        options: &ExtractOptions,
    ) -> anyhow::Result<&'c mut C> {
        let fields = FieldTree::from_document(source, options)?;
        self.collect(context, &fields)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    type Log = Vec<String>;

    fn record(entry: &'static str) -> HandlerNode<Log> {
        HandlerNode::leaf(move |log: &mut Log| log.push(entry.to_string()))
    }

    fn tree(json: &str) -> FieldTree {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn fires_only_on_full_path() {
        let fields = tree(r#"{"a":{"b":{}}}"#);

        let mut log = Log::new();
        let handlers = HandlerMap::new().field("a", HandlerMap::new().field("b", record("a.b")));
        dispatch(&mut log, &handlers.into(), &fields).unwrap();
        assert_eq!(log, vec!["a.b"]);

        let mut log = Log::new();
        let handlers = HandlerMap::new().field("a", HandlerMap::new().field("c", record("a.c")));
        dispatch(&mut log, &handlers.into(), &fields).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn unrequested_ancestor_prunes() {
        let mut log = Log::new();
        let handlers = HandlerMap::new().field("a", HandlerMap::new().field("b", record("a.b")));
        dispatch(&mut log, &handlers.into(), &FieldTree::new()).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn callable_runs_before_its_children() {
        let node = HandlerNode::callable(|log: &mut Log| {
            log.push("a".to_string());
            Ok(Some(HandlerMap::new().field("b", record("a.b"))))
        });
        let handlers = HandlerMap::new().field("a", node);

        let mut log = Log::new();
        dispatch(&mut log, &handlers.into(), &tree(r#"{"a":{"b":{}}}"#)).unwrap();
        assert_eq!(log, vec!["a", "a.b"]);
    }

    #[test]
    fn returns_same_context() {
        let mut log = Log::new();
        let expected: *const Log = &log;
        let returned = dispatch(&mut log, &HandlerMap::new().into(), &tree(r#"{"a":{}}"#)).unwrap();
        assert!(std::ptr::eq(expected, returned));
    }

    #[test]
    fn empty_map_is_noop() {
        let mut log = vec!["untouched".to_string()];
        dispatch(&mut log, &HandlerMap::new().into(), &tree(r#"{"a":{"b":{}},"c":{}}"#)).unwrap();
        assert_eq!(log, vec!["untouched"]);
    }

    #[test]
    fn handler_error_propagates_after_partial_mutation() {
        let failing = HandlerNode::callable(|_: &mut Log| Err(anyhow!("boom")));
        let handlers = HandlerMap::new().field("a", record("a")).field("b", failing);

        let mut log = Log::new();
        let err = dispatch(&mut log, &handlers.into(), &tree(r#"{"a":{},"b":{}}"#)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn collector_reuses_handlers() {
        let collector = Collector::new(HandlerMap::new().field("id", record("id")));

        let mut first = Log::new();
        collector.collect(&mut first, &tree(r#"{"id":{}}"#)).unwrap();
        let mut second = Log::new();
        collector.collect(&mut second, &tree(r#"{"name":{}}"#)).unwrap();

        assert_eq!(first, vec!["id"]);
        assert!(second.is_empty());
    }

    #[test]
    fn collector_from_document() {
        let collector = Collector::new(
            HandlerMap::new().field("post", HandlerMap::new().field("title", record("post.title"))),
        );
        let mut log = Log::new();
        collector
            .collect_document(&mut log, "{ post { title body } }", &ExtractOptions::default())
            .unwrap();
        assert_eq!(log, vec!["post.title"]);
    }

    #[test]
    fn siblings_run_in_declared_order() {
        let handlers = HandlerMap::new()
            .field("z", record("z"))
            .field("a", record("a"))
            .field("m", record("m"));

        let mut log = Log::new();
        dispatch(&mut log, &handlers.into(), &tree(r#"{"a":{},"m":{},"z":{}}"#)).unwrap();
        assert_eq!(log, vec!["z", "a", "m"]);
    }

    #[test]
    fn replaced_handler_keeps_position() {
        let handlers = HandlerMap::new()
            .field("z", record("first z"))
            .field("a", record("a"))
            .field("z", record("second z"));

        let mut log = Log::new();
        dispatch(&mut log, &handlers.into(), &tree(r#"{"a":{},"z":{}}"#)).unwrap();
        assert_eq!(log, vec!["second z", "a"]);
    }

    #[test]
    fn collector_clones_without_cloneable_context() {
        struct Columns(Vec<&'static str>);

        let collector = Collector::new(
            HandlerMap::new().field("id", HandlerNode::leaf(|columns: &mut Columns| columns.0.push("id"))),
        );
        let shared = collector.clone();
        let handle = std::thread::spawn(move || {
            let mut columns = Columns(Vec::new());
            shared.collect(&mut columns, &tree(r#"{"id":{}}"#)).unwrap();
            columns.0
        });

        let mut columns = Columns(Vec::new());
        collector.collect(&mut columns, &tree(r#"{"name":{}}"#)).unwrap();
        assert!(columns.0.is_empty());
        assert_eq!(handle.join().unwrap(), vec!["id"]);
        assert_eq!(format!("{:?}", collector), r#"Collector { handler: {"id": Callable} }"#);
    }
}
