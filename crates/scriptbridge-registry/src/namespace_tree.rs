//! Namespace Tree - the hierarchy of registration scopes.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`Scope`] (the script-visible table plus its property table)
//! - Edges: `Contains(name)` from a namespace to each child
//!
//! The root node is the global table. The tree only grows: reopening a
//! namespace finds the existing node instead of creating a new one.

use std::cell::RefCell;
use std::rc::Rc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use scriptbridge_core::{State, Table, TypeHash};

use crate::dispatch_table::DispatchTable;
use crate::metamethods::{scope_index, scope_newindex};

/// Registry slot holding a state's tree.
const TREE_SLOT: &str = "scriptbridge.namespace_tree";

/// Edge types in the namespace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEdge {
    /// Parent namespace contains child namespace.
    /// The String is the child's simple name.
    Contains(String),
}

/// Data stored in each namespace node.
#[derive(Debug, Clone)]
pub struct Scope {
    /// The table scripts see for this namespace.
    pub table: Table,
    /// Getters and setters of namespace-level properties.
    pub properties: Rc<DispatchTable>,
}

/// The namespace graph of one state.
pub struct NamespaceTree {
    graph: DiGraph<Scope, NamespaceEdge>,
    root: NodeIndex,
}

impl NamespaceTree {
    /// Create a tree whose root is `globals`.
    pub fn new(globals: Table) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(Scope {
            table: globals,
            properties: Rc::new(DispatchTable::new("_G", TypeHash::EMPTY)),
        });
        Self { graph, root }
    }

    /// The tree of `state`, created on first use.
    pub fn of(state: &mut State) -> Rc<RefCell<NamespaceTree>> {
        let slot = TypeHash::slot(TREE_SLOT);
        if let Some(tree) = state.registry_get::<RefCell<NamespaceTree>>(slot) {
            return tree;
        }
        let tree = Rc::new(RefCell::new(NamespaceTree::new(state.globals().clone())));
        state.registry_set(slot, tree.clone());
        tree
    }

    /// Get the root namespace node index.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Get a namespace node's data.
    pub fn scope(&self, node: NodeIndex) -> Option<&Scope> {
        self.graph.node_weight(node)
    }

    /// Number of namespaces, the root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Find a child namespace by name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph
            .edges(parent)
            .find(|edge| matches!(edge.weight(), NamespaceEdge::Contains(n) if n == name))
            .map(|edge| edge.target())
    }

    /// Get or create a child namespace.
    ///
    /// A new child gets a fresh table, bound under `name` in the parent's
    /// table, whose metatable dispatches the child's properties.
    pub fn get_or_create_child(
        &mut self,
        parent: NodeIndex,
        name: &str,
        hide_metatable: bool,
    ) -> NodeIndex {
        if let Some(child) = self.find_child(parent, name) {
            return child;
        }

        let properties = Rc::new(DispatchTable::new(name, TypeHash::EMPTY));
        let meta = Table::new();
        meta.raw_set("__index", scope_index(properties.clone()));
        meta.raw_set("__newindex", scope_newindex(properties.clone()));
        if hide_metatable {
            meta.raw_set("__metatable", false);
        }
        let table = Table::new();
        table.set_metatable(Some(meta));

        if let Some(parent_scope) = self.graph.node_weight(parent) {
            parent_scope.table.raw_set(name, table.clone());
        }
        let child = self.graph.add_node(Scope { table, properties });
        self.graph
            .add_edge(parent, child, NamespaceEdge::Contains(name.to_string()));
        child
    }

    /// Find the parent namespace of a node.
    pub fn find_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// Get the simple name of a namespace node.
    pub fn get_namespace_name(&self, node: NodeIndex) -> Option<&str> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find_map(|edge| match edge.weight() {
                NamespaceEdge::Contains(name) => Some(name.as_str()),
            })
    }

    /// Get the full namespace path for a node.
    pub fn get_namespace_path(&self, node: NodeIndex) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = node;

        while current != self.root {
            if let Some(name) = self.get_namespace_name(current) {
                path.push(name.to_string());
            }
            match self.find_parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        path.reverse();
        path
    }

    /// Dotted name of `simple_name` inside namespace `node`.
    pub fn qualified_name(&self, node: NodeIndex, simple_name: &str) -> String {
        let path = self.get_namespace_path(node);
        if path.is_empty() {
            simple_name.to_string()
        } else {
            format!("{}.{}", path.join("."), simple_name)
        }
    }
}
