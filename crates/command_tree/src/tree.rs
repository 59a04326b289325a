use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::node::{ConfigNode, NodeData};
use crate::schema::NODE_FILE_NAME;

/// Parent-linked tree of configuration nodes, stored as an arena keyed by
/// node-file path.
///
/// Ownership flows strictly root-to-leaf through the arena; `parent` links
/// are plain path keys, so cycles cannot be constructed. Nodes are never
/// removed during a process's lifetime; file changes replace `data` in place
/// through [`ConfigTree::update`].
#[derive(Debug, Default)]
pub struct ConfigTree {
    nodes: HashMap<PathBuf, ConfigNode>,
    root: Option<PathBuf>,
}

impl ConfigTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&ConfigNode> {
        self.nodes.get(path)
    }

    #[must_use]
    pub fn root(&self) -> Option<&ConfigNode> {
        self.root.as_ref().and_then(|path| self.nodes.get(path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts a newly discovered node, linking it to the nearest known
    /// ancestor. Adding an already-known path degrades to [`Self::update`].
    ///
    /// A node with no known ancestor becomes the root when the tree is empty
    /// or when it sits above the current root (which is then re-parented
    /// beneath it); otherwise it attaches under the current root so the tree
    /// stays connected. Existing nodes whose directory falls under the new
    /// node's directory but which are currently linked above it are adopted,
    /// so out-of-order insertion converges to the same linkage as in-order
    /// insertion.
    pub fn add(&mut self, path: PathBuf, data: NodeData) {
        if self.nodes.contains_key(&path) {
            self.update(&path, data);
            return;
        }

        let mut node = ConfigNode::new(path.clone(), data);
        match self.resolve_parent(node.dir()) {
            Some(parent_path) => {
                node.parent = Some(parent_path.clone());
                if let Some(parent) = self.nodes.get_mut(&parent_path) {
                    parent.children.push(path.clone());
                }
            }
            None => match self.root.clone() {
                Some(root_path) => {
                    let root_dir = self
                        .nodes
                        .get(&root_path)
                        .map(|root| root.dir().to_path_buf())
                        .unwrap_or_default();
                    if root_dir.starts_with(node.dir()) {
                        // New node sits above the current root: re-root.
                        node.children.push(root_path.clone());
                        if let Some(old_root) = self.nodes.get_mut(&root_path) {
                            old_root.parent = Some(path.clone());
                        }
                        self.root = Some(path.clone());
                    } else {
                        node.parent = Some(root_path.clone());
                        if let Some(root) = self.nodes.get_mut(&root_path) {
                            root.children.push(path.clone());
                        }
                    }
                }
                None => {
                    self.root = Some(path.clone());
                }
            },
        }

        self.nodes.insert(path.clone(), node);
        self.adopt_descendants(&path);
    }

    /// Moves nodes that belong under `path`'s directory but are linked to a
    /// parent above it. Nodes already attached inside the subtree keep their
    /// (deeper, more precise) parent.
    fn adopt_descendants(&mut self, path: &Path) {
        let dir = match self.nodes.get(path) {
            Some(node) => node.dir().to_path_buf(),
            None => return,
        };

        let adopted: Vec<PathBuf> = self
            .nodes
            .values()
            .filter(|node| node.path.as_path() != path && node.dir().starts_with(&dir))
            .filter(|node| match &node.parent {
                Some(parent) => self
                    .nodes
                    .get(parent)
                    .is_some_and(|parent| !parent.dir().starts_with(&dir)),
                None => false,
            })
            .map(|node| node.path.clone())
            .collect();

        for child_path in adopted {
            let old_parent = self
                .nodes
                .get(&child_path)
                .and_then(|node| node.parent.clone());
            if let Some(old_parent) = old_parent {
                if let Some(parent) = self.nodes.get_mut(&old_parent) {
                    parent.children.retain(|child| child != &child_path);
                }
            }
            if let Some(node) = self.nodes.get_mut(&child_path) {
                node.parent = Some(path.to_path_buf());
            }
            if let Some(node) = self.nodes.get_mut(path) {
                node.children.push(child_path);
            }
        }
    }

    /// Replaces a node's data in place, preserving `path`, `parent`, and
    /// `children` identity. Returns false for unknown paths.
    pub fn update(&mut self, path: &Path, data: NodeData) -> bool {
        match self.nodes.get_mut(path) {
            Some(node) => {
                node.data = data;
                true
            }
            None => false,
        }
    }

    /// Nodes governing `file`, nearest ancestor first, found by descending
    /// from the root and testing directory prefixes.
    #[must_use]
    pub fn find_path_to_file(&self, file: &Path) -> Vec<&ConfigNode> {
        let mut chain = Vec::new();
        let mut current = match self.root() {
            Some(root) if file.starts_with(root.dir()) => root,
            _ => return chain,
        };

        loop {
            chain.push(current);
            let next = current.children.iter().find_map(|child_path| {
                self.nodes
                    .get(child_path)
                    .filter(|child| file.starts_with(child.dir()))
            });
            match next {
                Some(child) => current = child,
                None => break,
            }
        }

        chain.reverse();
        chain
    }

    /// The node at `path` followed by its ancestors up to the root.
    #[must_use]
    pub fn ancestor_chain(&self, path: &Path) -> Vec<&ConfigNode> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(path);
        while let Some(node) = current {
            chain.push(node);
            current = node.parent.as_ref().and_then(|parent| self.nodes.get(parent));
        }
        chain
    }

    fn resolve_parent(&self, dir: &Path) -> Option<PathBuf> {
        let mut level = dir.parent();
        while let Some(candidate_dir) = level {
            let candidate = candidate_dir.join(NODE_FILE_NAME);
            if self.nodes.contains_key(&candidate) {
                return Some(candidate);
            }
            level = candidate_dir.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::ConfigTree;
    use crate::node::NodeData;
    use crate::schema::NODE_FILE_NAME;

    fn node_path(dir: &str) -> PathBuf {
        Path::new(dir).join(NODE_FILE_NAME)
    }

    fn data_with_command(id: &str) -> NodeData {
        NodeData::parse(
            &format!(r#"{{ "commands": [{{ "id": "{id}", "prompt": "p" }}] }}"#),
            Path::new("/memory"),
        )
        .expect("test document parses")
    }

    #[test]
    fn add_links_nodes_by_nearest_known_ancestor() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/repo"), NodeData::default());
        tree.add(node_path("/repo/src/deep/module"), NodeData::default());

        let node = tree
            .find(&node_path("/repo/src/deep/module"))
            .expect("node exists");
        assert_eq!(node.parent(), Some(node_path("/repo").as_path()));
        assert_eq!(
            tree.root().expect("root exists").children(),
            &[node_path("/repo/src/deep/module")]
        );
    }

    #[test]
    fn find_path_to_file_returns_nearest_ancestor_first() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/d3"), NodeData::default());
        tree.add(node_path("/d3/d2"), NodeData::default());
        tree.add(node_path("/d3/d2/d1"), NodeData::default());

        let chain = tree.find_path_to_file(Path::new("/d3/d2/d1/main.rs"));
        let dirs: Vec<&Path> = chain.iter().map(|node| node.dir()).collect();
        assert_eq!(
            dirs,
            vec![
                Path::new("/d3/d2/d1"),
                Path::new("/d3/d2"),
                Path::new("/d3"),
            ]
        );
    }

    #[test]
    fn find_path_to_file_outside_the_tree_is_empty() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/repo"), NodeData::default());
        assert!(tree.find_path_to_file(Path::new("/elsewhere/x.rs")).is_empty());
    }

    #[test]
    fn update_replaces_data_but_preserves_linkage() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/repo"), NodeData::default());
        tree.add(node_path("/repo/src"), data_with_command("old"));

        let updated = tree.update(&node_path("/repo/src"), data_with_command("new"));
        assert!(updated);

        let node = tree.find(&node_path("/repo/src")).expect("node exists");
        assert_eq!(node.parent(), Some(node_path("/repo").as_path()));
        assert!(node.command("new").is_some());
        assert!(node.command("old").is_none());
        assert_eq!(
            tree.root().expect("root exists").children(),
            &[node_path("/repo/src")]
        );
    }

    #[test]
    fn update_of_unknown_path_is_rejected() {
        let mut tree = ConfigTree::new();
        assert!(!tree.update(&node_path("/nowhere"), NodeData::default()));
    }

    #[test]
    fn adding_an_ancestor_above_the_root_re_roots_the_tree() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/repo/src"), NodeData::default());
        tree.add(node_path("/repo"), NodeData::default());

        let root = tree.root().expect("root exists");
        assert_eq!(root.dir(), Path::new("/repo"));
        assert_eq!(root.children(), &[node_path("/repo/src")]);
        let child = tree.find(&node_path("/repo/src")).expect("node exists");
        assert_eq!(child.parent(), Some(node_path("/repo").as_path()));
    }

    #[test]
    fn disjoint_node_attaches_under_the_existing_root() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/repo"), NodeData::default());
        tree.add(node_path("/other"), NodeData::default());

        let node = tree.find(&node_path("/other")).expect("node exists");
        assert_eq!(node.parent(), Some(node_path("/repo").as_path()));
        assert_eq!(tree.root().expect("root exists").dir(), Path::new("/repo"));
    }

    #[test]
    fn ancestor_chain_walks_to_the_root() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/a"), NodeData::default());
        tree.add(node_path("/a/b"), NodeData::default());
        tree.add(node_path("/a/b/c"), NodeData::default());

        let chain = tree.ancestor_chain(&node_path("/a/b/c"));
        let dirs: Vec<&Path> = chain.iter().map(|node| node.dir()).collect();
        assert_eq!(
            dirs,
            vec![Path::new("/a/b/c"), Path::new("/a/b"), Path::new("/a")]
        );
    }

    #[test]
    fn inserting_between_ancestor_and_descendant_re_parents_the_descendant() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/d3"), NodeData::default());
        tree.add(node_path("/d3/d2/d1"), NodeData::default());
        tree.add(node_path("/d3/d2"), NodeData::default());

        let chain = tree.find_path_to_file(Path::new("/d3/d2/d1/main.rs"));
        let dirs: Vec<&Path> = chain.iter().map(|node| node.dir()).collect();
        assert_eq!(
            dirs,
            vec![
                Path::new("/d3/d2/d1"),
                Path::new("/d3/d2"),
                Path::new("/d3"),
            ]
        );

        let middle = tree.find(&node_path("/d3/d2")).expect("node exists");
        assert_eq!(middle.parent(), Some(node_path("/d3").as_path()));
        assert_eq!(middle.children(), &[node_path("/d3/d2/d1")]);
        assert_eq!(
            tree.root().expect("root exists").children(),
            &[node_path("/d3/d2")]
        );

        let leaf = tree.ancestor_chain(&node_path("/d3/d2/d1"));
        assert_eq!(leaf.len(), 3);
    }

    #[test]
    fn adoption_leaves_deeper_linkage_alone() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/a"), NodeData::default());
        tree.add(node_path("/a/b"), NodeData::default());
        tree.add(node_path("/a/b/c"), NodeData::default());
        // Re-rooting above /a must adopt only /a; /a/b and /a/b/c stay put.
        tree.add(node_path("/"), NodeData::default());

        let root = tree.root().expect("root exists");
        assert_eq!(root.dir(), Path::new("/"));
        assert_eq!(root.children(), &[node_path("/a")]);
        let mid = tree.find(&node_path("/a/b")).expect("node exists");
        assert_eq!(mid.parent(), Some(node_path("/a").as_path()));
    }

    #[test]
    fn re_adding_a_known_path_updates_data_in_place() {
        let mut tree = ConfigTree::new();
        tree.add(node_path("/repo"), data_with_command("one"));
        tree.add(node_path("/repo"), data_with_command("two"));

        assert_eq!(tree.len(), 1);
        let node = tree.find(&node_path("/repo")).expect("node exists");
        assert!(node.command("two").is_some());
    }
}
