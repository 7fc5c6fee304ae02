//! Control-flow graph facts over an already-lowered [`IRFunction`]:
//! dominance, used by the verifier's operand-dominance check (spec P5),
//! and natural loops. The builder already records predecessor/successor
//! edges per block as it emits branches, so this module only has to
//! derive dominance and postorder from that, not rediscover edges from
//! terminators.

use crate::ir::{BlockId, IRFunction};
use std::collections::{HashMap, HashSet, VecDeque};

pub struct ControlFlowGraph {
    pub dominators: HashMap<BlockId, HashSet<BlockId>>,
    pub idom: HashMap<BlockId, BlockId>,
    pub postorder: HashMap<BlockId, u32>,
}

impl ControlFlowGraph {
    pub fn new(func: &IRFunction) -> Self {
        let postorder = compute_postorder(func);
        let mut cfg = Self { dominators: HashMap::new(), idom: HashMap::new(), postorder };
        cfg.compute_dominators(func);
        cfg
    }

    fn compute_dominators(&mut self, func: &IRFunction) {
        let blocks: Vec<BlockId> = func.blocks.indices().collect();
        if blocks.is_empty() {
            return;
        }
        let entry = func.entry;

        let mut doms: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
        for block_id in &blocks {
            let mut set = HashSet::new();
            if *block_id == entry {
                set.insert(entry);
            } else {
                for b in &blocks {
                    set.insert(*b);
                }
            }
            doms.insert(*block_id, set);
        }

        let mut changed = true;
        while changed {
            changed = false;
            for block_id in &blocks {
                if *block_id == entry {
                    continue;
                }
                let preds = &func.blocks[*block_id].predecessors;
                if preds.is_empty() {
                    continue;
                }
                let mut new_dom: HashSet<BlockId> = HashSet::new();
                let mut first = true;
                for pred in preds {
                    if let Some(pred_dom) = doms.get(pred) {
                        if first {
                            new_dom = pred_dom.clone();
                            first = false;
                        } else {
                            new_dom = new_dom.intersection(pred_dom).cloned().collect();
                        }
                    }
                }
                new_dom.insert(*block_id);

                if new_dom != doms[block_id] {
                    doms.insert(*block_id, new_dom);
                    changed = true;
                }
            }
        }

        self.dominators = doms;
        self.compute_immediate_dominators(func);
    }

    fn compute_immediate_dominators(&mut self, func: &IRFunction) {
        let blocks: Vec<BlockId> = func.blocks.indices().collect();
        let entry = func.entry;

        for block_id in &blocks {
            if *block_id == entry {
                continue;
            }
            let Some(doms) = self.dominators.get(block_id) else { continue };
            let mut idom_candidate: Option<BlockId> = None;

            for candidate in &blocks {
                if *candidate == *block_id || !doms.contains(candidate) {
                    continue;
                }
                let is_idom = blocks.iter().all(|other| {
                    *other == *candidate
                        || *other == *block_id
                        || !doms.contains(other)
                        || self.dominators[other].contains(candidate)
                });
                if is_idom {
                    let better = match idom_candidate {
                        None => true,
                        Some(current) => self.postorder[candidate] > self.postorder[&current],
                    };
                    if better {
                        idom_candidate = Some(*candidate);
                    }
                }
            }
            if let Some(idom) = idom_candidate {
                self.idom.insert(*block_id, idom);
            }
        }
    }

    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.dominators.get(&b).is_some_and(|doms| doms.contains(&a))
    }
}

fn compute_postorder(func: &IRFunction) -> HashMap<BlockId, u32> {
    let mut visited = HashSet::new();
    let mut postorder = HashMap::new();
    let mut counter = 0;

    fn dfs(
        node: BlockId,
        func: &IRFunction,
        visited: &mut HashSet<BlockId>,
        postorder: &mut HashMap<BlockId, u32>,
        counter: &mut u32,
    ) {
        visited.insert(node);
        for &succ in &func.blocks[node].successors {
            if !visited.contains(&succ) {
                dfs(succ, func, visited, postorder, counter);
            }
        }
        postorder.insert(node, *counter);
        *counter += 1;
    }

    if func.blocks.len() > 0 {
        dfs(func.entry, func, &mut visited, &mut postorder, &mut counter);
    }
    postorder
}

/// Blocks with no path from the entry block, used by dead-code
/// elimination's unreachable-block sweep (spec §4.9).
pub fn unreachable_blocks(func: &IRFunction) -> HashSet<BlockId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(func.entry);
    visited.insert(func.entry);
    while let Some(current) = queue.pop_front() {
        for &succ in &func.blocks[current].successors {
            if visited.insert(succ) {
                queue.push_back(succ);
            }
        }
    }
    func.blocks.indices().filter(|id| !visited.contains(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::ir::IRType;

    fn diamond() -> IRFunction {
        let mut b = Builder::new();
        b.create_function("f", vec![], IRType::I32);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let then_bb = b.create_block("then");
        let else_bb = b.create_block("else");
        let merge_bb = b.create_block("merge");
        let cond = b.const_bool(true);
        b.emit_cond_br(cond, then_bb, else_bb);
        b.set_insert_point(then_bb);
        b.emit_br(merge_bb);
        b.set_insert_point(else_bb);
        b.emit_br(merge_bb);
        b.set_insert_point(merge_bb);
        let zero = b.const_int(IRType::I32, 0);
        b.emit_ret(Some(zero));
        b.finish_function()
    }

    #[test]
    fn entry_dominates_every_block() {
        let f = diamond();
        let cfg = ControlFlowGraph::new(&f);
        for id in f.blocks.indices() {
            assert!(cfg.dominates(f.entry, id));
        }
    }

    #[test]
    fn merge_block_is_not_dominated_by_either_branch() {
        let f = diamond();
        let cfg = ControlFlowGraph::new(&f);
        let then_bb = BlockId(1);
        let else_bb = BlockId(2);
        let merge_bb = BlockId(3);
        assert!(!cfg.dominates(then_bb, merge_bb));
        assert!(!cfg.dominates(else_bb, merge_bb));
    }

    #[test]
    fn no_unreachable_blocks_in_diamond() {
        let f = diamond();
        assert!(unreachable_blocks(&f).is_empty());
    }
}
