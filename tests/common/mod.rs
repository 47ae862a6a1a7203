#![allow(dead_code)]
use graphql_collector_lib::{FieldTree, HandlerMap, HandlerNode};

/// Context used by the integration tests: the handlers that ran, in order.
pub type Log = Vec<String>;

pub fn record(entry: &str) -> HandlerNode<Log> {
    let entry = entry.to_string();
    HandlerNode::leaf(move |log: &mut Log| log.push(entry.clone()))
}

pub fn tree(json: &str) -> FieldTree {
    serde_json::from_str(json).expect("field tree")
}

/// Field tree holding every path, merging shared prefixes.
pub fn tree_for(paths: &[Vec<String>]) -> FieldTree {
    let mut tree = FieldTree::new();
    for path in paths {
        let nested = path
            .iter()
            .rev()
            .fold(FieldTree::new(), |below, segment| FieldTree::new().with(segment, below));
        tree.merge(nested);
    }
    tree
}

/// Handler map with a recording leaf at the end of every path. All paths
/// must have the same length.
pub fn handlers_for(paths: &[Vec<String>], depth: usize) -> HandlerMap<Log> {
    let mut map = HandlerMap::new();
    let mut heads: Vec<&String> = paths.iter().map(|path| &path[depth]).collect();
    heads.sort();
    heads.dedup();

    for head in heads {
        let below: Vec<Vec<String>> = paths.iter().filter(|path| &path[depth] == head).cloned().collect();
        if depth + 1 == below[0].len() {
            map.insert(head, record(&below[0].join(".")));
        } else {
            map.insert(head, handlers_for(&below, depth + 1));
        }
    }
    map
}
