use std::collections::HashMap;

use apollo_parser::ast::{self, AstNode, Definition, Selection};
use apollo_parser::Parser;
use log::{debug, trace};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CollectError;

use super::FieldTree;

/// Controls how a GraphQL document is turned into a [`FieldTree`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Operation to extract; may be omitted when the document has exactly one.
    pub operation_name: Option<String>,
    /// Values for variables referenced by `@skip` / `@include`.
    pub variables: Map<String, Value>,
    /// Field path the returned tree is rooted at, e.g. `["post"]` for the
    /// selection a `post` resolver receives.
    pub root: Vec<String>,
    pub include_introspection: bool,
}

impl FieldTree {
    /// Extracts the requested fields of one operation in `source`.
    ///
    /// Fields are keyed by name, never alias, and fragments are flattened into
    /// the level they are spread at.
    pub fn from_document(source: &str, options: &ExtractOptions) -> Result<FieldTree, CollectError> {
        let ast = Parser::new(source).parse();
        if let Some(err) = ast.errors().next() {
            return Err(CollectError::Syntax {
                message: err.message().to_string(),
                index: err.index(),
            });
        }

        let mut operations = Vec::new();
        let mut fragments = HashMap::new();
        for definition in ast.document().definitions() {
            match definition {
                Definition::OperationDefinition(operation) => operations.push(operation),
                Definition::FragmentDefinition(fragment) => {
                    if let Some(name) = fragment.fragment_name().and_then(|f| f.name()) {
                        fragments.insert(name.text().to_string(), fragment);
                    }
                }
                // type system definitions carry no selections
                _ => {}
            }
        }

        let operation = pick_operation(operations, options.operation_name.as_deref())?;
        debug!(
            "extracting fields of operation {:?}",
            operation.name().map(|n| n.text().to_string())
        );

        let walker = SelectionWalker {
            fragments: &fragments,
            options,
        };
        let mut tree = FieldTree::new();
        if let Some(selection_set) = operation.selection_set() {
            walker.walk(&selection_set, &mut tree, &mut Vec::new())?;
        }

        if options.root.is_empty() {
            Ok(tree)
        } else {
            tree.descend(options.root.as_slice()).map(FieldTree::clone)
        }
    }
}

fn pick_operation(
    mut operations: Vec<ast::OperationDefinition>,
    name: Option<&str>,
) -> Result<ast::OperationDefinition, CollectError> {
    match name {
        Some(name) => operations
            .into_iter()
            .find(|operation| {
                operation
                    .name()
                    .map(|n| n.text().to_string() == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| CollectError::UnknownOperation(name.to_string())),
        None => match operations.len() {
            0 => Err(CollectError::UnknownOperation("<anonymous>".to_string())),
            1 => Ok(operations.remove(0)),
            count => Err(CollectError::AmbiguousOperation(count)),
        },
    }
}

struct SelectionWalker<'a> {
    fragments: &'a HashMap<String, ast::FragmentDefinition>,
    options: &'a ExtractOptions,
}

impl SelectionWalker<'_> {
    /// `spreads` holds the fragments currently being expanded.
    fn walk(
        &self,
        selection_set: &ast::SelectionSet,
        dst: &mut FieldTree,
        spreads: &mut Vec<String>,
    ) -> Result<(), CollectError> {
        for selection in selection_set.selections() {
            match selection {
                Selection::Field(field) => {
                    if !self.included(field.directives()) {
                        continue;
                    }
                    let Some(name) = field.name() else { continue };
                    let name = name.text().to_string();
                    if name.starts_with("__") && !self.options.include_introspection {
                        trace!("dropping introspection field {}", name);
                        continue;
                    }

                    let mut subtree = FieldTree::new();
                    if let Some(inner) = field.selection_set() {
                        self.walk(&inner, &mut subtree, spreads)?;
                    }
                    dst.insert(&name, subtree);
                }
                Selection::FragmentSpread(spread) => {
                    if !self.included(spread.directives()) {
                        continue;
                    }
                    let Some(name) = spread.fragment_name().and_then(|f| f.name()) else { continue };
                    let name = name.text().to_string();
                    if spreads.contains(&name) {
                        return Err(CollectError::FragmentCycle(name));
                    }
                    let fragment = self
                        .fragments
                        .get(&name)
                        .ok_or_else(|| CollectError::UnknownFragment(name.clone()))?;

                    spreads.push(name);
                    if let Some(inner) = fragment.selection_set() {
                        self.walk(&inner, dst, spreads)?;
                    }
                    spreads.pop();
                }
                Selection::InlineFragment(inline) => {
                    if !self.included(inline.directives()) {
                        continue;
                    }
                    if let Some(inner) = inline.selection_set() {
                        self.walk(&inner, dst, spreads)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn included(&self, directives: Option<ast::Directives>) -> bool {
        let Some(directives) = directives else { return true };
        for directive in directives.directives() {
            let name = directive
                .name()
                .map(|n| n.text().to_string())
                .unwrap_or_default();
            match name.as_str() {
                "skip" if self.condition(&directive) => return false,
                "include" if !self.condition(&directive) => return false,
                _ => {}
            }
        }
        true
    }

    /// Value of the directive's `if` argument. Unset variables count as false.
    fn condition(&self, directive: &ast::Directive) -> bool {
        let argument = directive.arguments().and_then(|arguments| {
            arguments.arguments().find(|argument| {
                argument
                    .name()
                    .map(|n| n.text().to_string() == "if")
                    .unwrap_or(false)
            })
        });

        match argument.and_then(|argument| argument.value()) {
            Some(ast::Value::BooleanValue(value)) => value.syntax().text().to_string().trim() == "true",
            Some(ast::Value::Variable(variable)) => variable
                .name()
                .and_then(|n| self.options.variables.get(&n.text().to_string()))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            _ => false,
        }
    }
}
