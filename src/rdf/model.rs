//! Reading and writing trained forests.
//!
//! The text format has one token per line. A tree starts with `T<index>`
//! followed by its root. A split node is written as `.L`, left subtree,
//! `.R`, right subtree, `>D`, `u.x u.y v.x v.y t`, `.U`; a leaf as `>L`,
//! `#<count>`, the probabilities, `.U`.
//!
//! The binary format starts with `HRDF`, a version and the number of trees.
//! Every tree is its node count followed by the nodes in pre-order.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::num::{ParseFloatError, ParseIntError};
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use classes::NUM_CLASSES;
use super::feature::Decision;
use super::forest::RandomDecisionForest;
use super::node::{self, Node, NodeId, NodeKind, Probabilities};
use super::tree::DecisionTree;

type End = LittleEndian;

const MAGIC: &'static [u8; 4] = b"HRDF";
const BINARY_VERSION: u32 = 1;
const TAG_LEAF: u8 = 0;
const TAG_SPLIT: u8 = 1;

#[derive(Debug)]
pub enum ModelError {
    IoError(io::Error),
    UnexpectedEof,
    UnexpectedToken(String),
    BadNumber(String),
    TreeIndexMismatch { expected: usize, found: usize },
    ClassCountMismatch { expected: usize, found: usize },
    /// A node without payload or a split without both children
    IncompleteNode { tree: usize },
    EmptyModel,
    BadHeader,
    UnsupportedVersion(u32),
    UntrainedTree(usize),
}

impl From<io::Error> for ModelError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ModelError::UnexpectedEof
        } else {
            ModelError::IoError(err)
        }
    }
}

impl From<ParseFloatError> for ModelError {
    fn from(err: ParseFloatError) -> Self {
        ModelError::BadNumber(err.to_string())
    }
}

impl From<ParseIntError> for ModelError {
    fn from(err: ParseIntError) -> Self {
        ModelError::BadNumber(err.to_string())
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ModelError::IoError(ref err) => err.fmt(f),
            ModelError::UnexpectedEof => write!(f, "Unexpected end of model"),
            ModelError::UnexpectedToken(ref t) => write!(f, "Unexpected token '{}'", t),
            ModelError::BadNumber(ref t) => write!(f, "Invalid number: {}", t),
            ModelError::TreeIndexMismatch { expected, found } => {
                write!(f, "Expected tree {} but found tree {}", expected, found)
            }
            ModelError::ClassCountMismatch { expected, found } => {
                write!(f, "Expected {} classes but found {}", expected, found)
            }
            ModelError::IncompleteNode { tree } => write!(f, "Incomplete node in tree {}", tree),
            ModelError::EmptyModel => write!(f, "Model contains no trees"),
            ModelError::BadHeader => write!(f, "Not a binary forest model"),
            ModelError::UnsupportedVersion(v) => write!(f, "Unsupported model version {}", v),
            ModelError::UntrainedTree(i) => write!(f, "Tree {} is not trained", i),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ModelError::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

// Text format

fn write_node<W: Write>(w: &mut W, nodes: &[Node], idx: NodeId) -> io::Result<()> {
    match nodes[idx].kind {
        NodeKind::Split { ref decision, left, right } => {
            writeln!(w, ".L")?;
            write_node(w, nodes, left)?;
            writeln!(w, ".R")?;
            write_node(w, nodes, right)?;
            writeln!(w, ">D")?;
            writeln!(w, "{}", decision.u.x())?;
            writeln!(w, "{}", decision.u.y())?;
            writeln!(w, "{}", decision.v.x())?;
            writeln!(w, "{}", decision.v.y())?;
            writeln!(w, "{}", decision.t)?;
        }
        NodeKind::Leaf { ref probabilities } => {
            writeln!(w, ">L")?;
            writeln!(w, "#{}", probabilities.len())?;
            for p in probabilities.iter() {
                writeln!(w, "{}", p)?;
            }
        }
    }
    writeln!(w, ".U")
}

enum Payload {
    Split(Decision),
    Leaf(Probabilities),
}

/// Node of a tree being read. Children are created when the reader
/// descends into them, the payload may come later.
#[derive(Default)]
struct ProtoNode {
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    payload: Option<Payload>,
}

struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Result<&'a str, ModelError> {
        self.iter.next().ok_or(ModelError::UnexpectedEof)
    }

    fn parse<T: FromStr>(&mut self) -> Result<T, ModelError> {
        let tok = self.next()?;
        T::from_str(tok).map_err(|_| ModelError::BadNumber(tok.to_string()))
    }
}

fn child(nodes: &mut Vec<ProtoNode>, cursor: NodeId, left: bool) -> NodeId {
    let existing = if left { nodes[cursor].left } else { nodes[cursor].right };
    if let Some(c) = existing {
        return c;
    }
    nodes.push(ProtoNode { parent: Some(cursor), ..ProtoNode::default() });
    let c = nodes.len() - 1;
    if left {
        nodes[cursor].left = Some(c);
    } else {
        nodes[cursor].right = Some(c);
    }
    c
}

/// Turns the read nodes into an arena, root first.
fn finish_tree(tree: usize, protos: Vec<ProtoNode>) -> Result<DecisionTree, ModelError> {
    let kinds: Vec<Option<NodeKind>> = protos.iter()
        .map(|p| match p.payload {
            Some(Payload::Leaf(probabilities)) => {
                Some(NodeKind::Leaf { probabilities: probabilities })
            }
            Some(Payload::Split(decision)) => {
                match (p.left, p.right) {
                    (Some(left), Some(right)) => {
                        Some(NodeKind::Split {
                            decision: decision,
                            left: left,
                            right: right,
                        })
                    }
                    _ => None,
                }
            }
            None => None,
        })
        .collect();
    // every node reachable from the root needs a payload
    let mut stack = vec![0];
    while let Some(idx) = stack.pop() {
        match kinds[idx] {
            Some(NodeKind::Split { left, right, .. }) => {
                stack.push(left);
                stack.push(right);
            }
            Some(NodeKind::Leaf { .. }) => {}
            None => return Err(ModelError::IncompleteNode { tree: tree }),
        }
    }
    let nodes: Vec<Node> = protos.iter()
        .zip(kinds)
        .map(|(p, kind)| {
            Node {
                parent: p.parent,
                kind: kind.unwrap_or(NodeKind::Leaf { probabilities: [0.0; NUM_CLASSES] }),
            }
        })
        .collect();
    Ok(DecisionTree::from_nodes(node::compact(&nodes, 0)))
}

fn read_tree(tree: usize, tokens: &mut Tokens) -> Result<DecisionTree, ModelError> {
    let mut nodes = vec![ProtoNode::default()];
    let mut cursor = 0;
    loop {
        match tokens.next()? {
            ".L" => cursor = child(&mut nodes, cursor, true),
            ".R" => cursor = child(&mut nodes, cursor, false),
            ".U" => {
                match nodes[cursor].parent {
                    Some(p) => cursor = p,
                    None => break,
                }
            }
            ">D" => {
                let u = [tokens.parse()?, tokens.parse()?];
                let v = [tokens.parse()?, tokens.parse()?];
                let t = tokens.parse()?;
                nodes[cursor].payload = Some(Payload::Split(Decision::new(u, v, t)));
            }
            ">L" => {
                let count = tokens.next()?;
                if !count.starts_with('#') {
                    return Err(ModelError::UnexpectedToken(count.to_string()));
                }
                let count = usize::from_str(&count[1..])?;
                if count != NUM_CLASSES {
                    return Err(ModelError::ClassCountMismatch {
                        expected: NUM_CLASSES,
                        found: count,
                    });
                }
                let mut probabilities = [0.0; NUM_CLASSES];
                for p in probabilities.iter_mut() {
                    *p = tokens.parse()?;
                }
                nodes[cursor].payload = Some(Payload::Leaf(probabilities));
            }
            other => return Err(ModelError::UnexpectedToken(other.to_string())),
        }
    }
    finish_tree(tree, nodes)
}

/// Parses a forest in text format.
pub fn read_text(text: &str) -> Result<Vec<DecisionTree>, ModelError> {
    let mut tokens = Tokens { iter: text.split_whitespace() };
    let mut trees = vec![];
    while let Some(header) = tokens.iter.next() {
        if !header.starts_with('T') {
            return Err(ModelError::UnexpectedToken(header.to_string()));
        }
        let idx = usize::from_str(&header[1..])?;
        if idx != trees.len() {
            return Err(ModelError::TreeIndexMismatch {
                expected: trees.len(),
                found: idx,
            });
        }
        trees.push(read_tree(idx, &mut tokens)?);
    }
    if trees.is_empty() {
        return Err(ModelError::EmptyModel);
    }
    Ok(trees)
}

// Binary format

fn write_binary_tree<W: Write>(w: &mut W, nodes: &[Node]) -> io::Result<()> {
    let mut stack = vec![0];
    while let Some(idx) = stack.pop() {
        match nodes[idx].kind {
            NodeKind::Leaf { ref probabilities } => {
                w.write_u8(TAG_LEAF)?;
                w.write_u16::<End>(probabilities.len() as u16)?;
                for p in probabilities.iter() {
                    w.write_f32::<End>(*p)?;
                }
            }
            NodeKind::Split { ref decision, left, right } => {
                w.write_u8(TAG_SPLIT)?;
                w.write_i32::<End>(decision.u.x())?;
                w.write_i32::<End>(decision.u.y())?;
                w.write_i32::<End>(decision.v.x())?;
                w.write_i32::<End>(decision.v.y())?;
                w.write_f32::<End>(decision.t)?;
                stack.push(right);
                stack.push(left);
            }
        }
    }
    Ok(())
}

/// Which child of a split node the next node in the stream becomes
#[derive(Clone, Copy)]
enum Slot {
    Root,
    Left(NodeId),
    Right(NodeId),
}

/// Reads the nodes of one tree in pre-order. The pending children are
/// kept on a stack, so deep trees need no recursion.
fn read_binary_tree<R: Read>(r: &mut R,
                            tree: usize,
                            node_count: usize)
                            -> Result<Vec<Node>, ModelError> {
    let mut nodes: Vec<Node> = Vec::with_capacity(node_count.min(1 << 16));
    let mut pending = vec![Slot::Root];
    while let Some(slot) = pending.pop() {
        if nodes.len() == node_count {
            return Err(ModelError::IncompleteNode { tree: tree });
        }
        let idx = nodes.len();
        let parent = match slot {
            Slot::Root => None,
            Slot::Left(p) | Slot::Right(p) => Some(p),
        };
        match r.read_u8()? {
            TAG_LEAF => {
                let count = r.read_u16::<End>()? as usize;
                if count != NUM_CLASSES {
                    return Err(ModelError::ClassCountMismatch {
                        expected: NUM_CLASSES,
                        found: count,
                    });
                }
                let mut probabilities = [0.0; NUM_CLASSES];
                for p in probabilities.iter_mut() {
                    *p = r.read_f32::<End>()?;
                }
                nodes.push(Node::leaf(parent, probabilities));
            }
            TAG_SPLIT => {
                let u = [r.read_i32::<End>()?, r.read_i32::<End>()?];
                let v = [r.read_i32::<End>()?, r.read_i32::<End>()?];
                let t = r.read_f32::<End>()?;
                nodes.push(Node {
                    parent: parent,
                    kind: NodeKind::Split {
                        decision: Decision::new(u, v, t),
                        left: 0,
                        right: 0,
                    },
                });
                pending.push(Slot::Right(idx));
                pending.push(Slot::Left(idx));
            }
            tag => return Err(ModelError::UnexpectedToken(format!("node tag {}", tag))),
        }
        match slot {
            Slot::Root => {}
            Slot::Left(p) => {
                if let NodeKind::Split { ref mut left, .. } = nodes[p].kind {
                    *left = idx;
                }
            }
            Slot::Right(p) => {
                if let NodeKind::Split { ref mut right, .. } = nodes[p].kind {
                    *right = idx;
                }
            }
        }
    }
    if nodes.len() != node_count {
        return Err(ModelError::IncompleteNode { tree: tree });
    }
    Ok(nodes)
}

/// Parses a forest in binary format.
pub fn read_binary<R: Read>(r: &mut R) -> Result<Vec<DecisionTree>, ModelError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(|_| ModelError::BadHeader)?;
    if &magic != MAGIC {
        return Err(ModelError::BadHeader);
    }
    let version = r.read_u32::<End>()?;
    if version != BINARY_VERSION {
        return Err(ModelError::UnsupportedVersion(version));
    }
    let count = r.read_u32::<End>()? as usize;
    if count == 0 {
        return Err(ModelError::EmptyModel);
    }
    let mut trees = Vec::with_capacity(count.min(1024));
    for t in 0..count {
        let node_count = r.read_u32::<End>()? as usize;
        let nodes = read_binary_tree(r, t, node_count)?;
        trees.push(DecisionTree::from_nodes(nodes));
    }
    Ok(trees)
}

impl RandomDecisionForest {
    fn check_saveable(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::EmptyModel);
        }
        match self.trees.iter().position(|t| !t.is_trained()) {
            Some(i) => Err(ModelError::UntrainedTree(i)),
            None => Ok(()),
        }
    }

    /// Writes the forest in text format.
    pub fn write_text<W: Write>(&self, w: &mut W) -> Result<(), ModelError> {
        self.check_saveable()?;
        for (i, tree) in self.trees.iter().enumerate() {
            writeln!(w, "T{}", i)?;
            write_node(w, tree.nodes(), 0)?;
        }
        Ok(())
    }

    /// Writes the forest in binary format.
    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<(), ModelError> {
        self.check_saveable()?;
        w.write_all(MAGIC)?;
        w.write_u32::<End>(BINARY_VERSION)?;
        w.write_u32::<End>(self.trees.len() as u32)?;
        for tree in self.trees.iter() {
            w.write_u32::<End>(tree.nodes().len() as u32)?;
            write_binary_tree(w, tree.nodes())?;
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_text(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_binary(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Replaces the trees by those of the text model.
    /// On error the forest is unchanged.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ModelError> {
        let mut text = String::new();
        File::open(path)?.read_to_string(&mut text)?;
        self.trees = read_text(&text)?;
        Ok(())
    }

    /// Replaces the trees by those of the binary model.
    /// On error the forest is unchanged.
    pub fn load_binary<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ModelError> {
        let mut r = BufReader::new(File::open(path)?);
        self.trees = read_binary(&mut r)?;
        Ok(())
    }

    /// Reads a model in either format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RandomDecisionForest, ModelError> {
        let mut data = vec![];
        File::open(path)?.read_to_end(&mut data)?;
        let trees = if data.starts_with(MAGIC) {
            read_binary(&mut &data[..])?
        } else {
            let text = String::from_utf8(data).map_err(|_| ModelError::BadHeader)?;
            read_text(&text)?
        };
        Ok(RandomDecisionForest { trees: trees })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use image::Luma;
    use rdf::forest::{ForestTrainContext, TrainParams};
    use types::{BACKGROUND_DEPTH, BACKGROUND_INDEX, ClassImage, DepthImage};

    fn training_set() -> (Vec<ClassImage>, Vec<DepthImage>) {
        let depths: Vec<_> = (0..2)
            .map(|i| {
                DepthImage::from_fn(40, 30, |x, y| if x >= 5 && x < 35 && y >= 5 && y < 25 {
                    Luma([0.7 + 0.2 * i as f32 + 0.003 * x as f32])
                } else {
                    Luma([BACKGROUND_DEPTH])
                })
            })
            .collect();
        let classes = depths.iter()
            .map(|d| {
                ClassImage::from_fn(40, 30, |x, y| if d[(x, y)].0[0] >= BACKGROUND_DEPTH {
                    Luma([BACKGROUND_INDEX])
                } else {
                    Luma([((x - 5) / 10) as i8 + 2 * ((y - 5) / 10) as i8])
                })
            })
            .collect();
        (classes, depths)
    }

    fn forest() -> RandomDecisionForest {
        let (classes, depths) = training_set();
        let params = TrainParams::new(2, 150, 50, 6).unwrap().offset_range(15).seed(Some(3));
        let mut forest = RandomDecisionForest::new(3);
        forest.train(&ForestTrainContext::new(params, &classes, &depths)).unwrap();
        forest
    }

    fn temp(name: &str) -> ::std::path::PathBuf {
        env::temp_dir().join(format!("handrdf_model_test_{}", name))
    }

    #[test]
    fn test_text_roundtrip() {
        let forest = forest();
        let path = temp("text");
        forest.save_to_file(&path).unwrap();
        let mut loaded = RandomDecisionForest::new(0);
        loaded.load_from_file(&path).unwrap();
        assert_eq!(loaded, forest);
        let (_, depths) = training_set();
        assert_eq!(forest.classify_image(&depths[0]).unwrap().classes,
                   loaded.classify_image(&depths[0]).unwrap().classes);
        let _ = ::std::fs::remove_file(&path);
    }

    #[test]
    fn test_binary_roundtrip() {
        let forest = forest();
        let path = temp("binary");
        forest.save_binary(&path).unwrap();
        let mut loaded = RandomDecisionForest::new(0);
        loaded.load_binary(&path).unwrap();
        assert_eq!(loaded, forest);
        let auto = RandomDecisionForest::from_file(&path).unwrap();
        assert_eq!(auto, forest);
        let _ = ::std::fs::remove_file(&path);
    }

    #[test]
    fn test_text_layout() {
        let mut probabilities = [0.0; NUM_CLASSES];
        probabilities[3] = 0.25;
        probabilities[4] = 0.75;
        let nodes = vec![Node {
                             parent: None,
                             kind: NodeKind::Split {
                                 decision: Decision::new([1, -2], [3, 4], 0.1),
                                 left: 1,
                                 right: 2,
                             },
                         },
                         Node::leaf(Some(0), probabilities),
                         Node::leaf(Some(0), probabilities)];
        let forest = RandomDecisionForest { trees: vec![DecisionTree::from_nodes(nodes)] };
        let mut out = vec![];
        forest.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(&lines[..4], &["T0", ".L", ">L", "#22"]);
        assert_eq!(lines[4 + 3], "0.25");
        assert_eq!(lines[4 + 4], "0.75");
        let tail: Vec<_> = lines[lines.len() - 7..].to_vec();
        assert_eq!(tail, vec![">D", "1", "-2", "3", "4", "0.1", ".U"]);
        assert_eq!(read_text(&text).unwrap()[0], forest.trees[0]);
    }

    fn leaf_text() -> String {
        let mut s = String::from(">L\n#22\n");
        for _ in 0..NUM_CLASSES {
            s.push_str("0.5\n");
        }
        s.push_str(".U\n");
        s
    }

    #[test]
    fn test_malformed_text() {
        match read_text("") {
            Err(ModelError::EmptyModel) => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_text(&format!("T1\n{}", leaf_text())) {
            Err(ModelError::TreeIndexMismatch { expected: 0, found: 1 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_text("T0\n>L\n#22\n0.1\n") {
            Err(ModelError::UnexpectedEof) => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_text("T0\n>X\n") {
            Err(ModelError::UnexpectedToken(ref t)) if t == ">X" => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_text("T0\n>L\n#3\n0.1\n0.2\n0.7\n.U\n") {
            Err(ModelError::ClassCountMismatch { expected: 22, found: 3 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_text("T0\n>D\n1\n2\nabc\n4\n0.5\n.U\n") {
            Err(ModelError::BadNumber(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        // split without right child
        match read_text(&format!("T0\n.L\n{}>D\n1\n2\n3\n4\n0.5\n.U\n", leaf_text())) {
            Err(ModelError::IncompleteNode { tree: 0 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        // root without payload
        match read_text("T0\n.U\n") {
            Err(ModelError::IncompleteNode { tree: 0 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(read_text(&format!("T0\n{}T1\n{}", leaf_text(), leaf_text())).unwrap().len(),
                   2);
    }

    #[test]
    fn test_failed_load_keeps_forest() {
        let mut forest = forest();
        let before = forest.clone();
        let path = temp("broken");
        ::std::fs::write(&path, "T0\n.L\n>L\n#22\n").unwrap();
        assert!(forest.load_from_file(&path).is_err());
        assert_eq!(forest, before);
        assert!(forest.load_binary(&path).is_err());
        assert_eq!(forest, before);
        assert!(forest.load_from_file(temp("missing")).is_err());
        assert_eq!(forest, before);
        let _ = ::std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_binary() {
        let forest = forest();
        let mut data = vec![];
        forest.write_binary(&mut data).unwrap();
        match read_binary(&mut &data[..data.len() - 3]) {
            Err(ModelError::UnexpectedEof) => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_binary(&mut &b"HRDX\x01\x00\x00\x00"[..]) {
            Err(ModelError::BadHeader) => {}
            other => panic!("unexpected {:?}", other),
        }
        match read_binary(&mut &b"HRDF\x02\x00\x00\x00"[..]) {
            Err(ModelError::UnsupportedVersion(2)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    fn split_chain(node_count: u32, splits: usize) -> Vec<u8> {
        let mut data = vec![];
        data.extend_from_slice(MAGIC);
        data.write_u32::<End>(BINARY_VERSION).unwrap();
        data.write_u32::<End>(1).unwrap();
        data.write_u32::<End>(node_count).unwrap();
        for _ in 0..splits {
            data.write_u8(TAG_SPLIT).unwrap();
            for _ in 0..4 {
                data.write_i32::<End>(1).unwrap();
            }
            data.write_f32::<End>(0.1).unwrap();
        }
        data
    }

    #[test]
    fn test_deep_binary_chain() {
        // a long chain of splits without any leaf ends with the file
        let data = split_chain(600001, 300000);
        match read_binary(&mut &data[..]) {
            Err(ModelError::UnexpectedEof) => {}
            other => panic!("unexpected {:?}", other.map(|t| t.len())),
        }
        // more nodes in the stream than announced
        let data = split_chain(1000, 5000);
        match read_binary(&mut &data[..]) {
            Err(ModelError::IncompleteNode { tree: 0 }) => {}
            other => panic!("unexpected {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_binary_node_count_mismatch() {
        let forest = forest();
        let mut data = vec![];
        forest.write_binary(&mut data).unwrap();
        // announce one node more than the first tree has
        let count = (&data[12..16]).read_u32::<End>().unwrap();
        (&mut data[12..16]).write_u32::<End>(count + 1).unwrap();
        match read_binary(&mut &data[..]) {
            Err(ModelError::IncompleteNode { tree: 0 }) => {}
            other => panic!("unexpected {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_save_untrained() {
        let forest = RandomDecisionForest::new(2);
        let mut out = vec![];
        match forest.write_text(&mut out) {
            Err(ModelError::UntrainedTree(0)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
