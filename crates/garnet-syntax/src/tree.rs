//! Arena-backed syntax tree.
//!
//! Nodes are identified by [`NodeId`], an index into the tree's arena.
//! Node identity (not source range) is what the checker keys its results
//! on: two nodes may share a range.

use rowan::{TextRange, TextSize};
use rustc_hash::FxHashMap;

use crate::annotation::Annotation;
use crate::kind::NodeKind;

/// Identity of a node within one [`SyntaxTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A child slot of a node. The meaning of each slot depends on the kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Node(NodeId),
    Symbol(String),
    Int(i64),
    /// Float literal text as written.
    Float(String),
    Str(String),
    /// An absent optional child (`nil` in the dump).
    Nil,
}

#[derive(Clone, Debug)]
pub struct NodeData {
    pub kind: NodeKind,
    pub children: Vec<Child>,
    pub range: TextRange,
    pub parent: Option<NodeId>,
}

/// A whole syntax tree for one file.
#[derive(Clone, Debug, Default)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    annotations: FxHashMap<NodeId, Vec<Annotation>>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Children must already be in the arena; their parent
    /// links are set here.
    pub fn alloc(&mut self, kind: NodeKind, children: Vec<Child>, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in &children {
            if let Child::Node(c) = child {
                self.nodes[c.0 as usize].parent = Some(id);
            }
        }
        self.nodes.push(NodeData {
            kind,
            children,
            range,
            parent: None,
        });
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<Node<'_>> {
        self.root.map(|id| self.node(id))
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate every node id in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn annotate(&mut self, id: NodeId, annotation: Annotation) {
        self.annotations.entry(id).or_default().push(annotation);
    }

    /// Annotations attached directly to `id`, in source order.
    pub fn annotations(&self, id: NodeId) -> &[Annotation] {
        self.annotations.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of all nodes reachable from the root, parents before children.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            let data = &self.nodes[id.0 as usize];
            for child in data.children.iter().rev() {
                if let Child::Node(c) = child {
                    stack.push(*c);
                }
            }
        }
        out
    }

    /// The innermost node whose range contains `offset`.
    pub fn node_at(&self, offset: TextSize) -> Option<NodeId> {
        let mut current = self.root?;
        if !self.nodes[current.0 as usize].range.contains_inclusive(offset) {
            return None;
        }
        'descend: loop {
            for child in &self.nodes[current.0 as usize].children {
                if let Child::Node(c) = child {
                    if self.nodes[c.0 as usize].range.contains_inclusive(offset) {
                        current = *c;
                        continue 'descend;
                    }
                }
            }
            return Some(current);
        }
    }
}

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> Node<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.0 as usize]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn range(&self) -> TextRange {
        self.data().range
    }

    pub fn children(&self) -> &'t [Child] {
        &self.data().children
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|p| self.tree.node(p))
    }

    /// The node in slot `index`, or `None` when the slot is absent or holds
    /// a non-node value.
    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        match self.data().children.get(index) {
            Some(Child::Node(id)) => Some(self.tree.node(*id)),
            _ => None,
        }
    }

    /// All node children, skipping scalar slots.
    pub fn child_nodes(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        self.data().children.iter().filter_map(move |c| match c {
            Child::Node(id) => Some(tree.node(*id)),
            _ => None,
        })
    }

    /// Node children from slot `start` on.
    pub fn child_nodes_from(&self, start: usize) -> Vec<Node<'t>> {
        self.data()
            .children
            .iter()
            .skip(start)
            .filter_map(|c| match c {
                Child::Node(id) => Some(self.tree.node(*id)),
                _ => None,
            })
            .collect()
    }

    pub fn symbol(&self, index: usize) -> Option<&'t str> {
        match self.data().children.get(index) {
            Some(Child::Symbol(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn string(&self, index: usize) -> Option<&'t str> {
        match self.data().children.get(index) {
            Some(Child::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        match self.data().children.get(index) {
            Some(Child::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn annotations(&self) -> &'t [Annotation] {
        self.tree.annotations(self.id)
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == kind
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}@{:?}", self.kind(), self.id.0, self.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn alloc_links_parents() {
        let mut tree = SyntaxTree::new();
        let one = tree.alloc(NodeKind::Int, vec![Child::Int(1)], range(6, 7));
        let send = tree.alloc(
            NodeKind::Send,
            vec![Child::Nil, Child::Symbol("foo".into()), Child::Node(one)],
            range(0, 8),
        );
        tree.set_root(send);

        let root = tree.root().unwrap();
        assert_eq!(root.kind(), NodeKind::Send);
        assert!(root.child(0).is_none());
        assert_eq!(root.symbol(1), Some("foo"));
        let arg = root.child(2).unwrap();
        assert_eq!(arg.int(0), Some(1));
        assert_eq!(arg.parent().map(|p| p.id()), Some(send));
    }

    #[test]
    fn node_at_finds_innermost() {
        let mut tree = SyntaxTree::new();
        let one = tree.alloc(NodeKind::Int, vec![Child::Int(1)], range(6, 7));
        let send = tree.alloc(
            NodeKind::Send,
            vec![Child::Nil, Child::Symbol("foo".into()), Child::Node(one)],
            range(0, 8),
        );
        tree.set_root(send);
        assert_eq!(tree.node_at(TextSize::from(6)), Some(one));
        assert_eq!(tree.node_at(TextSize::from(2)), Some(send));
        assert_eq!(tree.node_at(TextSize::from(30)), None);
    }

    #[test]
    fn reachable_is_preorder() {
        let mut tree = SyntaxTree::new();
        let a = tree.alloc(NodeKind::Int, vec![Child::Int(1)], range(0, 1));
        let b = tree.alloc(NodeKind::Int, vec![Child::Int(2)], range(2, 3));
        let begin = tree.alloc(NodeKind::Begin, vec![Child::Node(a), Child::Node(b)], range(0, 3));
        tree.set_root(begin);
        assert_eq!(tree.reachable(), vec![begin, a, b]);
    }
}
