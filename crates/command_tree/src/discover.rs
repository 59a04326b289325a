use std::path::{Path, PathBuf};

use tracing::warn;

use crate::node::{load_node_file, NodeData};
use crate::schema::NODE_FILE_NAME;
use crate::tree::ConfigTree;

/// Walks upward from `dir` collecting node files, topmost-first.
///
/// Scanning stops after (and including) the first document with
/// `root = true`, or at the filesystem root. A file that exists but fails
/// to load also stops the walk, with a warning: its `root` flag is
/// unknowable, and scanning past it could attach unrelated ancestor nodes
/// from outside the project.
#[must_use]
pub fn discover_chain(dir: &Path) -> Vec<(PathBuf, NodeData)> {
    let mut found = Vec::new();
    let mut level = Some(dir);

    while let Some(current) = level {
        let candidate = current.join(NODE_FILE_NAME);
        if candidate.is_file() {
            match load_node_file(&candidate) {
                Ok(data) => {
                    let stop = data.root;
                    found.push((candidate, data));
                    if stop {
                        break;
                    }
                }
                Err(error) => {
                    warn!(path = %candidate.display(), %error, "stopping discovery at unreadable node file");
                    break;
                }
            }
        }
        level = current.parent();
    }

    found.reverse();
    found
}

/// Discovers the node chain for `dir` and inserts it into `tree`.
///
/// Returns the path of the node nearest to `dir`, when any was found.
pub fn discover_into(tree: &mut ConfigTree, dir: &Path) -> Option<PathBuf> {
    let chain = discover_chain(dir);
    let nearest = chain.last().map(|(path, _)| path.clone());
    for (path, data) in chain {
        tree.add(path, data);
    }
    nearest
}
