//! The pack DAG: per-lane, per-operand producer relationships.
//!
//! Nodes own their packs; the graph owns its nodes. Producer entries in
//! the operand tables and the producer/consumer back-reference sets hold
//! weak references so the node graph cannot leak through ownership
//! cycles. The instruction index holds strong references.
//!
//! Nodes are expected to arrive producers-first; the builder does not
//! topologically sort. External consumers iterate in reverse insertion
//! order, which approximates a top-of-graph-first traversal.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::core::{InstId, IrAdaptor, SlpError, SlpResult};

use super::pack::{Pack, PackType};

/// Shared handle to a DAG node.
pub type NodeRef<I> = Rc<RefCell<PackDagNode<I>>>;

type WeakNodeRef<I> = Weak<RefCell<PackDagNode<I>>>;

/// Who produces one operand lane: the producing node and its lane.
#[derive(Clone, Debug)]
pub struct ProducerInfo<I: InstId> {
    pub node: Weak<RefCell<PackDagNode<I>>>,
    pub lane: usize,
}

impl<I: InstId> ProducerInfo<I> {
    /// Upgrade to a live `(node, lane)` pair, `None` if the producer is
    /// gone.
    pub fn upgraded(&self) -> Option<(NodeRef<I>, usize)> {
        self.node.upgrade().map(|node| (node, self.lane))
    }
}

/// A node in the pack DAG.
#[derive(Debug)]
pub struct PackDagNode<I: InstId> {
    pack: Pack<I>,
    kind: PackType,
    id: usize,

    /// `operand_nodes[op_idx][lane]`: who produces operand `op_idx` of
    /// the instruction in `lane`. Empty when the operand is not produced
    /// by a packed instruction.
    operand_nodes: Vec<Vec<Option<ProducerInfo<I>>>>,

    producers: Vec<WeakNodeRef<I>>,
    consumers: Vec<WeakNodeRef<I>>,
}

impl<I: InstId> PackDagNode<I> {
    fn new(pack: Pack<I>, kind: PackType, id: usize, num_operands: usize) -> Self {
        let num_lanes = pack.num_lanes();
        Self {
            pack,
            kind,
            id,
            operand_nodes: vec![vec![None; num_lanes]; num_operands],
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    pub fn pack(&self) -> &Pack<I> {
        &self.pack
    }

    pub fn kind(&self) -> PackType {
        self.kind
    }

    /// Position in the graph's insertion order.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_seed(&self) -> bool {
        self.pack.is_seed()
    }

    pub fn num_lanes(&self) -> usize {
        self.pack.num_lanes()
    }

    pub fn num_operands(&self) -> usize {
        self.operand_nodes.len()
    }

    /// Producers of the `op_idx`-th operand, lane by lane.
    pub fn op_producers(&self, op_idx: usize) -> &[Option<ProducerInfo<I>>] {
        &self.operand_nodes[op_idx]
    }

    /// Producer of operand `op_idx` in `lane`, if any.
    pub fn operand_producer(&self, op_idx: usize, lane: usize) -> Option<ProducerInfo<I>> {
        self.operand_nodes[op_idx][lane].clone()
    }

    /// Nodes producing values this node consumes.
    pub fn producers(&self) -> Vec<NodeRef<I>> {
        self.producers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Nodes consuming values this node produces.
    pub fn consumers(&self) -> Vec<NodeRef<I>> {
        self.consumers.iter().filter_map(Weak::upgrade).collect()
    }

    fn note_producer(&mut self, node: &NodeRef<I>) {
        if !self.producers.iter().any(|w| w.as_ptr() == Rc::as_ptr(node)) {
            self.producers.push(Rc::downgrade(node));
        }
    }

    fn note_consumer(&mut self, node: &NodeRef<I>) {
        if !self.consumers.iter().any(|w| w.as_ptr() == Rc::as_ptr(node)) {
            self.consumers.push(Rc::downgrade(node));
        }
    }
}

/// A DAG of packed instructions.
pub struct PackDag<I: InstId> {
    /// Nodes in insertion order.
    nodes: Vec<NodeRef<I>>,
    seeds: Vec<NodeRef<I>>,

    /// Which node and lane owns each packed instruction.
    inst_index: FxHashMap<I, (NodeRef<I>, usize)>,
}

impl<I: InstId> Default for PackDag<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InstId> PackDag<I> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            seeds: Vec::new(),
            inst_index: FxHashMap::default(),
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[NodeRef<I>] {
        &self.nodes
    }

    /// Seed nodes in insertion order.
    pub fn seeds(&self) -> &[NodeRef<I>] {
        &self.seeds
    }

    /// Nodes in reverse insertion order (most recently added first).
    pub fn iter(&self) -> impl Iterator<Item = &NodeRef<I>> {
        self.nodes.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node and lane owning `inst`, if it is packed.
    pub fn node_of(&self, inst: I) -> Option<(NodeRef<I>, usize)> {
        self.inst_index
            .get(&inst)
            .map(|(node, lane)| (Rc::clone(node), *lane))
    }

    /// Add a pack to the graph.
    ///
    /// Fails if the pack's kind cannot be inferred, if any lane is
    /// already owned by another node, or if the node would turn out to
    /// be its own producer. The one exception to the last rule: a store
    /// pack may consume its own lanes (chained sequence writes); those
    /// operand slots stay empty.
    pub fn add_node<A: IrAdaptor<InstRef = I>>(
        &mut self,
        pack: Pack<I>,
        adaptor: &A,
    ) -> SlpResult<NodeRef<I>> {
        let kind = pack.kind(adaptor)?;

        // Instructions may be owned by at most one node.
        for &inst in pack.lanes() {
            if self.inst_index.contains_key(&inst) {
                return Err(SlpError::DuplicateInst {
                    inst: adaptor.inst_name(inst),
                });
            }
        }

        let num_operands = pack.num_operands(adaptor);
        let lanes: Vec<I> = pack.lanes().to_vec();
        let id = self.nodes.len();
        log::trace!("dag node {}: {}", id, pack.dbg_string(adaptor));

        let node = Rc::new(RefCell::new(PackDagNode::new(pack, kind, id, num_operands)));

        for (lane, &inst) in lanes.iter().enumerate() {
            self.inst_index.insert(inst, (Rc::clone(&node), lane));
        }

        self.init_operand_map(&node, &lanes, adaptor)?;
        self.update_downstream_maps(&node, &lanes, adaptor)?;

        self.nodes.push(Rc::clone(&node));
        if node.borrow().is_seed() {
            self.seeds.push(Rc::clone(&node));
        }

        Ok(node)
    }

    /// Fill the new node's operand table from already-registered
    /// producers.
    fn init_operand_map<A: IrAdaptor<InstRef = I>>(
        &self,
        node: &NodeRef<I>,
        lanes: &[I],
        adaptor: &A,
    ) -> SlpResult<()> {
        let kind = node.borrow().kind;
        let num_operands = node.borrow().num_operands();

        for op_idx in 0..num_operands {
            for (lane_idx, &inst) in lanes.iter().enumerate() {
                let Some(op_inst) = adaptor.value_as_inst(adaptor.operand(inst, op_idx)) else {
                    continue;
                };
                let Some((producer, producer_lane)) = self.inst_index.get(&op_inst) else {
                    continue;
                };

                if Rc::ptr_eq(producer, node) {
                    // Chained sequence writes consume their own lanes;
                    // the slot stays empty.
                    if kind == PackType::Store {
                        continue;
                    }
                    return Err(SlpError::CyclicPack {
                        pack: node.borrow().pack.dbg_string(adaptor),
                    });
                }

                {
                    let mut n = node.borrow_mut();
                    n.operand_nodes[op_idx][lane_idx] = Some(ProducerInfo {
                        node: Rc::downgrade(producer),
                        lane: *producer_lane,
                    });
                    n.note_producer(producer);
                }
                producer.borrow_mut().note_consumer(node);
            }
        }

        Ok(())
    }

    /// Patch operand tables of nodes consuming the new node's lanes.
    fn update_downstream_maps<A: IrAdaptor<InstRef = I>>(
        &self,
        node: &NodeRef<I>,
        lanes: &[I],
        adaptor: &A,
    ) -> SlpResult<()> {
        let kind = node.borrow().kind;

        for (lane_idx, &inst) in lanes.iter().enumerate() {
            let uses: Vec<(I, usize)> = adaptor.users(inst).collect();
            for (user, op_no) in uses {
                if user == inst {
                    continue;
                }
                let Some((consumer, consumer_lane)) = self.inst_index.get(&user) else {
                    continue;
                };

                if Rc::ptr_eq(consumer, node) {
                    if kind == PackType::Store {
                        continue;
                    }
                    return Err(SlpError::CyclicPack {
                        pack: node.borrow().pack.dbg_string(adaptor),
                    });
                }

                {
                    let mut c = consumer.borrow_mut();
                    c.operand_nodes[op_no][*consumer_lane] = Some(ProducerInfo {
                        node: Rc::downgrade(node),
                        lane: lane_idx,
                    });
                    c.note_producer(node);
                }
                node.borrow_mut().note_consumer(consumer);
            }
        }

        Ok(())
    }

    /// GraphViz rendering of the graph.
    ///
    /// One box per node labeled with its kind and lane names (seed nodes
    /// bordered green); lane relations between one producer/consumer
    /// pair collapse into a single edge labeled with the
    /// `(producer_lane, consumer_lane)` pairs.
    pub fn to_graphviz<A: IrAdaptor<InstRef = I>>(&self, adaptor: &A) -> String {
        let mut out = String::new();
        out.push_str("\n\ndigraph G {\n");

        for node in &self.nodes {
            let n = node.borrow();

            let names: Vec<String> = n
                .pack
                .lanes()
                .iter()
                .map(|&inst| adaptor.inst_name(inst))
                .collect();
            out.push_str(&format!(
                "node{} [label=\"({})  {}\"",
                n.id,
                n.kind,
                names.join(", ")
            ));
            if n.is_seed() {
                out.push_str(", color=green");
            }
            out.push_str(", shape=box];\n");

            // Collapse lane relations per producer, in id order so the
            // rendering is deterministic.
            let mut idx_maps: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
            for op_idx in 0..n.num_operands() {
                for lane in 0..n.num_lanes() {
                    let Some(info) = &n.operand_nodes[op_idx][lane] else {
                        continue;
                    };
                    let Some(producer) = info.node.upgrade() else {
                        continue;
                    };
                    let producer_id = producer.borrow().id;
                    idx_maps.entry(producer_id).or_default().push((info.lane, lane));
                }
            }

            for (producer_id, pairs) in idx_maps {
                let label: Vec<String> = pairs
                    .iter()
                    .map(|(x, y)| format!("({}, {})", x, y))
                    .collect();
                out.push_str(&format!(
                    "node{} -> node{} [label=\"{{{}}}\"];\n",
                    producer_id,
                    n.id,
                    label.join(" ")
                ));
            }
        }

        out.push_str("}\n\n\n");
        out
    }
}
