// SPDX-License-Identifier: Apache-2.0

//! Utility functions for walking the IR graph.

use crate::ir::{Fn, NodePayload, NodeRef};

/// Returns the list of operands for the provided node, in operand order.
pub fn operands(payload: &NodePayload) -> Vec<NodeRef> {
    use NodePayload::*;
    match payload {
        GetParam(_) => vec![],
        Literal(_) => vec![],
        Tuple(elems) => elems.clone(),
        Array(elems) => elems.clone(),
        TupleIndex { tuple, index: _ } => vec![*tuple],
        ArrayIndex { array, indices } => {
            let mut deps = vec![*array];
            deps.extend(indices.iter().cloned());
            deps
        }
        ArrayUpdate {
            array,
            value,
            indices,
        } => {
            let mut deps = vec![*array, *value];
            deps.extend(indices.iter().cloned());
            deps
        }
        Binop(_, a, b) => vec![*a, *b],
        Unop(_, a) => vec![*a],
        Nary(_, elems) => elems.clone(),
        SignExt {
            arg,
            new_bit_count: _,
        }
        | ZeroExt {
            arg,
            new_bit_count: _,
        } => vec![*arg],
        BitSlice {
            arg,
            start: _,
            width: _,
        } => vec![*arg],
        DynamicBitSlice {
            arg,
            start,
            width: _,
        } => vec![*arg, *start],
        Sel {
            selector,
            cases,
            default,
        }
        | PrioritySel {
            selector,
            cases,
            default,
        } => {
            let mut deps = vec![*selector];
            deps.extend(cases.iter().cloned());
            if let Some(d) = default {
                deps.push(*d);
            }
            deps
        }
        OneHotSel { selector, cases } => {
            let mut deps = vec![*selector];
            deps.extend(cases.iter().cloned());
            deps
        }
        OneHot { arg, lsb_prio: _ } => vec![*arg],
        Encode { arg } | Decode { arg, .. } => vec![*arg],
    }
}

/// Returns a topologically sorted list of node references for the given IR
/// function.
///
/// The ordering guarantees that for any node, all its dependency nodes will
/// appear before it in the returned vector.
pub fn get_topological(f: &Fn) -> Vec<NodeRef> {
    // Non-recursive DFS; deep graphs must not overflow the stack.
    let n = f.nodes.len();
    let mut visited: Vec<bool> = vec![false; n];
    let mut in_stack: Vec<bool> = vec![false; n];
    let mut order: Vec<NodeRef> = Vec::with_capacity(n);

    let deps: Vec<Vec<usize>> = f
        .nodes
        .iter()
        .map(|node| {
            operands(&node.payload)
                .into_iter()
                .map(|r| r.index)
                .collect()
        })
        .collect();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = Vec::new(); // (node_idx, next_child_pos)
        stack.push((start, 0));
        in_stack[start] = true;

        while let Some((node_idx, child_pos)) = stack.pop() {
            if visited[node_idx] {
                in_stack[node_idx] = false;
                continue;
            }
            if child_pos < deps[node_idx].len() {
                let next_child = deps[node_idx][child_pos];
                stack.push((node_idx, child_pos + 1));
                if !visited[next_child] {
                    assert!(
                        !in_stack[next_child],
                        "Cycle detected in IR graph; topological order impossible"
                    );
                    stack.push((next_child, 0));
                    in_stack[next_child] = true;
                }
                continue;
            }
            visited[node_idx] = true;
            in_stack[node_idx] = false;
            order.push(NodeRef { index: node_idx });
        }
    }
    assert_eq!(order.len(), n, "Topological sort did not include all nodes");
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Binop, Node, Param, ParamId, Type, Unop};
    use crate::ir_value::IrValue;

    fn node(text_id: usize, ty: Type, payload: NodePayload) -> Node {
        Node {
            text_id,
            name: None,
            ty,
            payload,
        }
    }

    fn verify_topo_property(f: &Fn, order: &[NodeRef]) {
        let mut pos: Vec<usize> = vec![0; f.nodes.len()];
        for (i, nr) in order.iter().enumerate() {
            pos[nr.index] = i;
        }
        for nr in order {
            for dep in operands(&f.get_node(*nr).payload) {
                assert!(
                    pos[dep.index] < pos[nr.index],
                    "dependency must precede user"
                );
            }
        }
    }

    #[test]
    fn topo_reorders_forward_references() {
        // Node 0 consumes node 2, which consumes the parameter at node 1.
        let f = Fn {
            name: "f".to_string(),
            params: vec![Param {
                name: "x".to_string(),
                ty: Type::Bits(4),
                id: ParamId::new(1),
            }],
            ret_ty: Type::Bits(4),
            nodes: vec![
                node(
                    3,
                    Type::Bits(4),
                    NodePayload::Binop(Binop::Add, NodeRef { index: 2 }, NodeRef { index: 2 }),
                ),
                Node {
                    text_id: 1,
                    name: Some("x".to_string()),
                    ty: Type::Bits(4),
                    payload: NodePayload::GetParam(ParamId::new(1)),
                },
                node(2, Type::Bits(4), NodePayload::Unop(Unop::Not, NodeRef { index: 1 })),
            ],
            ret_node_ref: Some(NodeRef { index: 0 }),
        };
        let order = get_topological(&f);
        assert_eq!(order.len(), 3);
        verify_topo_property(&f, &order);
        assert_eq!(order.last(), Some(&NodeRef { index: 0 }));
    }

    #[test]
    fn topo_keeps_unreachable_nodes() {
        let lit = |id, v| {
            node(
                id,
                Type::Bits(1),
                NodePayload::Literal(IrValue::make_ubits(1, v).unwrap()),
            )
        };
        let f = Fn {
            name: "f".to_string(),
            params: vec![],
            ret_ty: Type::Bits(1),
            nodes: vec![
                lit(1, 0),
                lit(2, 1),
                node(3, Type::Bits(1), NodePayload::Unop(Unop::Identity, NodeRef { index: 1 })),
            ],
            ret_node_ref: Some(NodeRef { index: 2 }),
        };
        let order = get_topological(&f);
        assert_eq!(order.len(), 3);
        verify_topo_property(&f, &order);
    }

    #[test]
    #[should_panic(expected = "Cycle detected")]
    fn topo_rejects_cycles() {
        let f = Fn {
            name: "f".to_string(),
            params: vec![],
            ret_ty: Type::Bits(1),
            nodes: vec![
                node(1, Type::Bits(1), NodePayload::Unop(Unop::Not, NodeRef { index: 1 })),
                node(2, Type::Bits(1), NodePayload::Unop(Unop::Not, NodeRef { index: 0 })),
            ],
            ret_node_ref: Some(NodeRef { index: 1 }),
        };
        get_topological(&f);
    }
}
