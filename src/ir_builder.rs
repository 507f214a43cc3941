// SPDX-License-Identifier: Apache-2.0

//! Programmatic construction of IR functions.
//!
//! The builder derives each node's type from its operands but does not
//! otherwise verify operand compatibility; mismatched widths are passed
//! through so the translator (and Z3) get to see them.

use crate::ir::{
    ArrayTypeData, Binop, Fn, NaryOp, Node, NodePayload, NodeRef, Param, ParamId, Type, Unop,
};
use crate::ir_value::IrValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BValue {
    node_ref: NodeRef,
}

impl BValue {
    pub fn node_ref(&self) -> NodeRef {
        self.node_ref
    }
}

pub struct FnBuilder {
    name: String,
    params: Vec<Param>,
    nodes: Vec<Node>,
    next_id: usize,
}

impl FnBuilder {
    pub fn new(name: &str) -> Self {
        FnBuilder {
            name: name.to_string(),
            params: Vec::new(),
            nodes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn build_with_return_value(self, return_value: &BValue) -> Fn {
        let ret_ty = self.nodes[return_value.node_ref.index].ty.clone();
        log::trace!(
            "built fn {} with {} nodes; returns {}",
            self.name,
            self.nodes.len(),
            ret_ty
        );
        Fn {
            name: self.name,
            params: self.params,
            ret_ty,
            nodes: self.nodes,
            ret_node_ref: Some(return_value.node_ref),
        }
    }

    pub fn get_type(&self, value: &BValue) -> &Type {
        &self.nodes[value.node_ref.index].ty
    }

    fn add_node(&mut self, ty: Type, payload: NodePayload, name: Option<&str>) -> BValue {
        let text_id = self.next_id;
        self.next_id += 1;
        self.nodes.push(Node {
            text_id,
            name: name.map(|s| s.to_string()),
            ty,
            payload,
        });
        BValue {
            node_ref: NodeRef {
                index: self.nodes.len() - 1,
            },
        }
    }

    fn bits_width(&self, value: &BValue) -> usize {
        match self.get_type(value) {
            Type::Bits(width) => *width,
            other => panic!("expected bits-typed operand, got {}", other),
        }
    }

    pub fn param(&mut self, name: &str, type_: &Type) -> BValue {
        let id = ParamId::new(self.next_id);
        self.params.push(Param {
            name: name.to_string(),
            ty: type_.clone(),
            id,
        });
        self.add_node(type_.clone(), NodePayload::GetParam(id), Some(name))
    }

    /// Adds a literal whose type is inferred from the value.
    pub fn literal(&mut self, value: &IrValue, name: Option<&str>) -> BValue {
        let ty = value
            .get_type()
            .unwrap_or_else(|e| panic!("literal has no well-formed type: {}", e));
        self.add_node(ty, NodePayload::Literal(value.clone()), name)
    }

    /// Adds a literal with an explicitly declared type; the value is not
    /// checked against it.
    pub fn literal_with_type(&mut self, value: &IrValue, ty: &Type, name: Option<&str>) -> BValue {
        self.add_node(ty.clone(), NodePayload::Literal(value.clone()), name)
    }

    fn binop(&mut self, op: Binop, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        let ty = if crate::ir::binop_is_comparison(op) {
            Type::Bits(1)
        } else {
            self.get_type(a).clone()
        };
        self.add_node(ty, NodePayload::Binop(op, a.node_ref, b.node_ref), name)
    }

    pub fn add(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Add, a, b, name)
    }

    pub fn sub(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Sub, a, b, name)
    }

    pub fn shll(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Shll, a, b, name)
    }

    pub fn shrl(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Shrl, a, b, name)
    }

    pub fn shra(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Shra, a, b, name)
    }

    pub fn eq(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Eq, a, b, name)
    }

    pub fn ne(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Ne, a, b, name)
    }

    pub fn ult(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Ult, a, b, name)
    }

    pub fn ule(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Ule, a, b, name)
    }

    pub fn ugt(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Ugt, a, b, name)
    }

    pub fn uge(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Uge, a, b, name)
    }

    pub fn slt(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Slt, a, b, name)
    }

    pub fn sle(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Sle, a, b, name)
    }

    pub fn sgt(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Sgt, a, b, name)
    }

    pub fn sge(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Sge, a, b, name)
    }

    pub fn udiv(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.binop(Binop::Udiv, a, b, name)
    }

    pub fn umul(
        &mut self,
        a: &BValue,
        b: &BValue,
        result_width: usize,
        name: Option<&str>,
    ) -> BValue {
        self.add_node(
            Type::Bits(result_width),
            NodePayload::Binop(Binop::Umul, a.node_ref, b.node_ref),
            name,
        )
    }

    pub fn smul(
        &mut self,
        a: &BValue,
        b: &BValue,
        result_width: usize,
        name: Option<&str>,
    ) -> BValue {
        self.add_node(
            Type::Bits(result_width),
            NodePayload::Binop(Binop::Smul, a.node_ref, b.node_ref),
            name,
        )
    }

    fn unop(&mut self, op: Unop, a: &BValue, name: Option<&str>) -> BValue {
        let ty = match op {
            Unop::OrReduce | Unop::AndReduce | Unop::XorReduce => Type::Bits(1),
            _ => self.get_type(a).clone(),
        };
        self.add_node(ty, NodePayload::Unop(op, a.node_ref), name)
    }

    pub fn not(&mut self, a: &BValue, name: Option<&str>) -> BValue {
        self.unop(Unop::Not, a, name)
    }

    pub fn neg(&mut self, a: &BValue, name: Option<&str>) -> BValue {
        self.unop(Unop::Neg, a, name)
    }

    pub fn rev(&mut self, a: &BValue, name: Option<&str>) -> BValue {
        self.unop(Unop::Reverse, a, name)
    }

    pub fn identity(&mut self, a: &BValue, name: Option<&str>) -> BValue {
        self.unop(Unop::Identity, a, name)
    }

    pub fn or_reduce(&mut self, a: &BValue, name: Option<&str>) -> BValue {
        self.unop(Unop::OrReduce, a, name)
    }

    /// Variadic bitwise operation (or concatenation) over `args`.
    pub fn nary(&mut self, op: NaryOp, args: &[&BValue], name: Option<&str>) -> BValue {
        assert!(!args.is_empty(), "{:?} requires at least one operand", op);
        let ty = match op {
            NaryOp::Concat => Type::Bits(args.iter().map(|a| self.bits_width(a)).sum()),
            _ => self.get_type(args[0]).clone(),
        };
        let operands = args.iter().map(|a| a.node_ref).collect();
        self.add_node(ty, NodePayload::Nary(op, operands), name)
    }

    pub fn and(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.nary(NaryOp::And, &[a, b], name)
    }

    pub fn nand(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.nary(NaryOp::Nand, &[a, b], name)
    }

    pub fn or(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.nary(NaryOp::Or, &[a, b], name)
    }

    pub fn nor(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.nary(NaryOp::Nor, &[a, b], name)
    }

    pub fn xor(&mut self, a: &BValue, b: &BValue, name: Option<&str>) -> BValue {
        self.nary(NaryOp::Xor, &[a, b], name)
    }

    /// The first argument lands in the most significant bits.
    pub fn concat(&mut self, args: &[&BValue], name: Option<&str>) -> BValue {
        self.nary(NaryOp::Concat, args, name)
    }

    pub fn sign_extend(&mut self, a: &BValue, new_bit_count: usize, name: Option<&str>) -> BValue {
        self.add_node(
            Type::Bits(new_bit_count),
            NodePayload::SignExt {
                arg: a.node_ref,
                new_bit_count,
            },
            name,
        )
    }

    pub fn zero_extend(&mut self, a: &BValue, new_bit_count: usize, name: Option<&str>) -> BValue {
        self.add_node(
            Type::Bits(new_bit_count),
            NodePayload::ZeroExt {
                arg: a.node_ref,
                new_bit_count,
            },
            name,
        )
    }

    pub fn bit_slice(
        &mut self,
        a: &BValue,
        start: usize,
        width: usize,
        name: Option<&str>,
    ) -> BValue {
        self.add_node(
            Type::Bits(width),
            NodePayload::BitSlice {
                arg: a.node_ref,
                start,
                width,
            },
            name,
        )
    }

    pub fn dynamic_bit_slice(
        &mut self,
        a: &BValue,
        start: &BValue,
        width: usize,
        name: Option<&str>,
    ) -> BValue {
        self.add_node(
            Type::Bits(width),
            NodePayload::DynamicBitSlice {
                arg: a.node_ref,
                start: start.node_ref,
                width,
            },
            name,
        )
    }

    pub fn tuple(&mut self, elements: &[&BValue], name: Option<&str>) -> BValue {
        let ty = Type::new_tuple(elements.iter().map(|e| self.get_type(e).clone()).collect());
        let refs = elements.iter().map(|e| e.node_ref).collect();
        self.add_node(ty, NodePayload::Tuple(refs), name)
    }

    pub fn tuple_index(&mut self, tuple: &BValue, index: usize, name: Option<&str>) -> BValue {
        let ty = match self.get_type(tuple) {
            Type::Tuple(types) => match types.get(index) {
                Some(ty) => (**ty).clone(),
                None => panic!("tuple index {} out of range for {}", index, types.len()),
            },
            other => panic!("tuple_index operand must be a tuple, got {}", other),
        };
        self.add_node(
            ty,
            NodePayload::TupleIndex {
                tuple: tuple.node_ref,
                index,
            },
            name,
        )
    }

    pub fn array(&mut self, elements: &[&BValue], name: Option<&str>) -> BValue {
        assert!(!elements.is_empty(), "arrays must have at least one element");
        let ty = Type::new_array(self.get_type(elements[0]).clone(), elements.len());
        let refs = elements.iter().map(|e| e.node_ref).collect();
        self.add_node(ty, NodePayload::Array(refs), name)
    }

    /// Indexes `array` by each of `indices` in turn, outermost dimension
    /// first.
    pub fn array_index(
        &mut self,
        array: &BValue,
        indices: &[&BValue],
        name: Option<&str>,
    ) -> BValue {
        let mut ty = self.get_type(array).clone();
        for _ in indices {
            ty = match ty {
                Type::Array(ArrayTypeData { element_type, .. }) => *element_type,
                other => panic!("too many indices for array_index; reached {}", other),
            };
        }
        self.add_node(
            ty,
            NodePayload::ArrayIndex {
                array: array.node_ref,
                indices: indices.iter().map(|i| i.node_ref).collect(),
            },
            name,
        )
    }

    pub fn array_update(
        &mut self,
        array: &BValue,
        value: &BValue,
        indices: &[&BValue],
        name: Option<&str>,
    ) -> BValue {
        let ty = self.get_type(array).clone();
        self.add_node(
            ty,
            NodePayload::ArrayUpdate {
                array: array.node_ref,
                value: value.node_ref,
                indices: indices.iter().map(|i| i.node_ref).collect(),
            },
            name,
        )
    }

    pub fn select(
        &mut self,
        selector: &BValue,
        cases: &[&BValue],
        default_value: Option<&BValue>,
        name: Option<&str>,
    ) -> BValue {
        assert!(!cases.is_empty(), "select requires at least one case");
        let ty = self.get_type(cases[0]).clone();
        self.add_node(
            ty,
            NodePayload::Sel {
                selector: selector.node_ref,
                cases: cases.iter().map(|c| c.node_ref).collect(),
                default: default_value.map(|d| d.node_ref),
            },
            name,
        )
    }

    pub fn one_hot_select(
        &mut self,
        selector: &BValue,
        cases: &[&BValue],
        name: Option<&str>,
    ) -> BValue {
        assert!(!cases.is_empty(), "one_hot_select requires at least one case");
        let ty = self.get_type(cases[0]).clone();
        self.add_node(
            ty,
            NodePayload::OneHotSel {
                selector: selector.node_ref,
                cases: cases.iter().map(|c| c.node_ref).collect(),
            },
            name,
        )
    }

    pub fn priority_select(
        &mut self,
        selector: &BValue,
        cases: &[&BValue],
        default_value: &BValue,
        name: Option<&str>,
    ) -> BValue {
        let ty = self.get_type(default_value).clone();
        self.add_node(
            ty,
            NodePayload::PrioritySel {
                selector: selector.node_ref,
                cases: cases.iter().map(|c| c.node_ref).collect(),
                default: Some(default_value.node_ref),
            },
            name,
        )
    }

    pub fn one_hot(&mut self, a: &BValue, lsb_prio: bool, name: Option<&str>) -> BValue {
        let width = self.bits_width(a) + 1;
        self.add_node(
            Type::Bits(width),
            NodePayload::OneHot {
                arg: a.node_ref,
                lsb_prio,
            },
            name,
        )
    }

    /// Result width is `ceil(log2(width(a)))`.
    pub fn encode(&mut self, a: &BValue, name: Option<&str>) -> BValue {
        let input_width = self.bits_width(a);
        let width = crate::sorts::ceil_log2(input_width);
        self.add_node(Type::Bits(width), NodePayload::Encode { arg: a.node_ref }, name)
    }

    pub fn decode(&mut self, a: &BValue, width: usize, name: Option<&str>) -> BValue {
        self.add_node(
            Type::Bits(width),
            NodePayload::Decode {
                arg: a.node_ref,
                width,
            },
            name,
        )
    }
}
