use classes::NUM_CLASSES;
use super::feature::Decision;

/// Index of a node within the arena of its tree
pub type NodeId = usize;

pub type Probabilities = [f32; NUM_CLASSES];

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf { probabilities: Probabilities },
    Split {
        decision: Decision,
        left: NodeId,
        right: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn leaf(parent: Option<NodeId>, probabilities: Probabilities) -> Node {
        Node {
            parent: parent,
            kind: NodeKind::Leaf { probabilities: probabilities },
        }
    }

    pub fn is_leaf(&self) -> bool {
        match self.kind {
            NodeKind::Leaf { .. } => true,
            NodeKind::Split { .. } => false,
        }
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Split { left, right, .. } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// Rebuilds the arena with only the nodes reachable from `root`,
/// ordered root, left subtree, right subtree.
pub fn compact(nodes: &[Node], root: NodeId) -> Vec<Node> {
    if nodes.is_empty() {
        return vec![];
    }
    let mut order = vec![];
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        order.push(idx);
        if let Some((left, right)) = nodes[idx].children() {
            stack.push(right);
            stack.push(left);
        }
    }
    let mut new_index = vec![None; nodes.len()];
    for (new, &old) in order.iter().enumerate() {
        new_index[old] = Some(new);
    }
    let remap = |idx: NodeId| new_index[idx].unwrap_or(0);
    order.iter()
        .map(|&old| {
            let node = &nodes[old];
            let parent = if old == root { None } else { node.parent.map(&remap) };
            let kind = match node.kind {
                NodeKind::Leaf { probabilities } => NodeKind::Leaf { probabilities: probabilities },
                NodeKind::Split { decision, left, right } => {
                    NodeKind::Split {
                        decision: decision,
                        left: remap(left),
                        right: remap(right),
                    }
                }
            };
            Node {
                parent: parent,
                kind: kind,
            }
        })
        .collect()
}
