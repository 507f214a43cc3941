// SPDX-License-Identifier: Apache-2.0

//! In-memory dataflow IR consumed by the translator.
//!
//! A function is a flat vector of nodes; operands refer to other nodes by
//! `NodeRef` index, so the graph is acyclic by construction when nodes only
//! refer to earlier entries (the builder guarantees this).

use crate::ir_utils::operands;
use crate::ir_value::IrValue;

/// Strongly-typed wrapper for parameter IDs.
///
/// Note: This is *not* the parameter's position. Positions are recovered by
/// looking the id up in `Fn::params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(usize);

impl ParamId {
    /// Constructs a new ParamId, asserting that the id is greater than zero.
    pub fn new(id: usize) -> Self {
        assert!(id > 0, "ParamId must be greater than zero, got {}", id);
        ParamId(id)
    }

    pub fn get_wrapped_id(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ArrayTypeData {
    pub element_type: Box<Type>,
    pub element_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Type {
    Token,
    Bits(usize),
    Tuple(Vec<Box<Type>>),
    Array(ArrayTypeData),
}

impl Type {
    pub fn new_array(element_type: Type, element_count: usize) -> Self {
        Type::Array(ArrayTypeData {
            element_type: Box::new(element_type),
            element_count,
        })
    }

    pub fn new_tuple(element_types: Vec<Type>) -> Self {
        Type::Tuple(element_types.into_iter().map(Box::new).collect())
    }

    /// Width of the value once flattened to a single bit vector.
    pub fn bit_count(&self) -> usize {
        match self {
            Type::Token => 0,
            Type::Bits(width) => *width,
            Type::Tuple(types) => types.iter().map(|t| t.bit_count()).sum(),
            Type::Array(ArrayTypeData {
                element_type,
                element_count,
            }) => element_type.bit_count() * element_count,
        }
    }

    /// Checks that `value` has exactly this shape (and widths).
    pub fn conforms(&self, value: &IrValue) -> bool {
        match (self, value) {
            (Type::Bits(width), IrValue::Bits(bits)) => bits.get_bit_count() == *width,
            (Type::Tuple(types), IrValue::Tuple(elements)) => {
                types.len() == elements.len()
                    && types.iter().zip(elements).all(|(t, e)| t.conforms(e))
            }
            (Type::Array(data), IrValue::Array(elements)) => {
                data.element_count == elements.len()
                    && elements.iter().all(|e| data.element_type.conforms(e))
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Token => write!(f, "token"),
            Type::Bits(width) => write!(f, "bits[{}]", width),
            Type::Tuple(types) => {
                write!(f, "(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                write!(f, ")")
            }
            Type::Array(ArrayTypeData {
                element_type,
                element_count,
            }) => {
                write!(f, "{}", element_type)?;
                write!(f, "[{}]", element_count)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binop {
    Add,
    Sub,

    Shll,
    Shrl,
    Shra,

    Eq,
    Ne,

    Uge,
    Ugt,
    Ult,
    Ule,

    // signed comparisons
    Sgt,
    Sge,
    Slt,
    Sle,

    Umul,
    Smul,

    Udiv,
    Sdiv,
    Umod,
    Smod,
}

pub fn binop_to_operator(binop: Binop) -> &'static str {
    match binop {
        Binop::Add => "add",
        Binop::Sub => "sub",
        Binop::Shll => "shll",
        Binop::Shrl => "shrl",
        Binop::Shra => "shra",
        Binop::Eq => "eq",
        Binop::Ne => "ne",
        Binop::Uge => "uge",
        Binop::Ugt => "ugt",
        Binop::Ult => "ult",
        Binop::Ule => "ule",
        Binop::Sgt => "sgt",
        Binop::Sge => "sge",
        Binop::Slt => "slt",
        Binop::Sle => "sle",
        Binop::Umul => "umul",
        Binop::Smul => "smul",
        Binop::Udiv => "udiv",
        Binop::Sdiv => "sdiv",
        Binop::Umod => "umod",
        Binop::Smod => "smod",
    }
}

/// Comparisons produce a single bit regardless of operand width.
pub fn binop_is_comparison(binop: Binop) -> bool {
    matches!(
        binop,
        Binop::Eq
            | Binop::Ne
            | Binop::Uge
            | Binop::Ugt
            | Binop::Ult
            | Binop::Ule
            | Binop::Sgt
            | Binop::Sge
            | Binop::Slt
            | Binop::Sle
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unop {
    Neg,
    Not,
    Identity,
    Reverse,
    OrReduce,
    AndReduce,
    XorReduce,
}

pub fn unop_to_operator(unop: Unop) -> &'static str {
    match unop {
        Unop::Neg => "neg",
        Unop::Not => "not",
        Unop::Identity => "identity",
        Unop::Reverse => "reverse",
        Unop::OrReduce => "or_reduce",
        Unop::AndReduce => "and_reduce",
        Unop::XorReduce => "xor_reduce",
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum NaryOp {
    And,
    Nor,
    Or,
    Xor,
    Nand,
    Concat,
}

pub fn nary_op_to_operator(nary_op: NaryOp) -> &'static str {
    match nary_op {
        NaryOp::And => "and",
        NaryOp::Nor => "nor",
        NaryOp::Or => "or",
        NaryOp::Xor => "xor",
        NaryOp::Nand => "nand",
        NaryOp::Concat => "concat",
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeRef {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    GetParam(ParamId),
    Literal(IrValue),
    Tuple(Vec<NodeRef>),
    Array(Vec<NodeRef>),
    TupleIndex {
        tuple: NodeRef,
        index: usize,
    },
    /// Indices are applied outermost dimension first; out-of-range indices
    /// clamp to the last element.
    ArrayIndex {
        array: NodeRef,
        indices: Vec<NodeRef>,
    },
    ArrayUpdate {
        array: NodeRef,
        value: NodeRef,
        indices: Vec<NodeRef>,
    },
    Binop(Binop, NodeRef, NodeRef),
    Unop(Unop, NodeRef),
    Nary(NaryOp, Vec<NodeRef>),
    SignExt {
        arg: NodeRef,
        new_bit_count: usize,
    },
    ZeroExt {
        arg: NodeRef,
        new_bit_count: usize,
    },
    BitSlice {
        arg: NodeRef,
        start: usize,
        width: usize,
    },
    DynamicBitSlice {
        arg: NodeRef,
        start: NodeRef,
        width: usize,
    },
    Sel {
        selector: NodeRef,
        cases: Vec<NodeRef>,
        default: Option<NodeRef>,
    },
    OneHotSel {
        selector: NodeRef,
        cases: Vec<NodeRef>,
    },
    PrioritySel {
        selector: NodeRef,
        cases: Vec<NodeRef>,
        default: Option<NodeRef>,
    },
    OneHot {
        arg: NodeRef,
        lsb_prio: bool,
    },
    Encode {
        arg: NodeRef,
    },
    Decode {
        arg: NodeRef,
        width: usize,
    },
}

impl NodePayload {
    pub fn get_operator(&self) -> &str {
        match self {
            NodePayload::GetParam(_) => "get_param",
            NodePayload::Literal(_) => "literal",
            NodePayload::Tuple(_) => "tuple",
            NodePayload::Array(_) => "array",
            NodePayload::TupleIndex { .. } => "tuple_index",
            NodePayload::ArrayIndex { .. } => "array_index",
            NodePayload::ArrayUpdate { .. } => "array_update",
            NodePayload::Binop(op, _, _) => binop_to_operator(*op),
            NodePayload::Unop(op, _) => unop_to_operator(*op),
            NodePayload::Nary(op, _) => nary_op_to_operator(*op),
            NodePayload::SignExt { .. } => "sign_ext",
            NodePayload::ZeroExt { .. } => "zero_ext",
            NodePayload::BitSlice { .. } => "bit_slice",
            NodePayload::DynamicBitSlice { .. } => "dynamic_bit_slice",
            NodePayload::Sel { .. } => "sel",
            NodePayload::OneHotSel { .. } => "one_hot_sel",
            NodePayload::PrioritySel { .. } => "priority_sel",
            NodePayload::OneHot { .. } => "one_hot",
            NodePayload::Encode { .. } => "encode",
            NodePayload::Decode { .. } => "decode",
        }
    }

    /// Non-operand attributes rendered as `key=value` pairs.
    fn attributes(&self) -> Vec<String> {
        match self {
            NodePayload::Literal(value) => vec![format!("value={}", value)],
            NodePayload::TupleIndex { index, .. } => vec![format!("index={}", index)],
            NodePayload::SignExt { new_bit_count, .. }
            | NodePayload::ZeroExt { new_bit_count, .. } => {
                vec![format!("new_bit_count={}", new_bit_count)]
            }
            NodePayload::BitSlice { start, width, .. } => {
                vec![format!("start={}", start), format!("width={}", width)]
            }
            NodePayload::DynamicBitSlice { width, .. } | NodePayload::Decode { width, .. } => {
                vec![format!("width={}", width)]
            }
            NodePayload::OneHot { lsb_prio, .. } => vec![format!("lsb_prio={}", lsb_prio)],
            _ => vec![],
        }
    }
}

/// Returns a human-oriented textual identifier for a node reference.
///
/// - For `get_param` nodes, returns the parameter's name.
/// - For other nodes, returns the node's `name` if present, otherwise
///   `"<operator>.<text_id>"`.
pub fn node_textual_id(f: &Fn, nr: NodeRef) -> String {
    let node = f.get_node(nr);
    match &node.name {
        Some(n) => n.clone(),
        None => format!("{}.{}", node.payload.get_operator(), node.text_id),
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    /// All nodes have known ids.
    pub text_id: usize,
    /// Params must have names, other nodes optionally have names.
    pub name: Option<String>,
    pub ty: Type,
    pub payload: NodePayload,
}

impl Node {
    /// Renders the node the way it would appear in IR text, e.g.
    /// `add.3: bits[8] = add(x, y, id=3)`.
    pub fn to_string(&self, f: &Fn) -> String {
        let name_str = match &self.name {
            Some(name) => name.clone(),
            None => format!("{}.{}", self.payload.get_operator(), self.text_id),
        };
        let mut args: Vec<String> = match &self.payload {
            NodePayload::GetParam(_) => vec![],
            _ => operands(&self.payload)
                .into_iter()
                .map(|o| node_textual_id(f, o))
                .collect(),
        };
        args.extend(self.payload.attributes());
        args.push(format!("id={}", self.text_id));
        format!(
            "{}: {} = {}({})",
            name_str,
            self.ty,
            self.payload.get_operator(),
            args.join(", ")
        )
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub id: ParamId,
}

#[derive(Debug, Clone)]
pub struct Fn {
    pub name: String,
    pub params: Vec<Param>,
    pub ret_ty: Type,
    pub nodes: Vec<Node>,
    pub ret_node_ref: Option<NodeRef>,
}

impl Fn {
    pub fn node_refs(&self) -> Vec<NodeRef> {
        (0..self.nodes.len())
            .map(|i| NodeRef { index: i })
            .collect()
    }

    pub fn get_node(&self, node_ref: NodeRef) -> &Node {
        &self.nodes[node_ref.index]
    }

    pub fn get_node_ty(&self, node_ref: NodeRef) -> &Type {
        &self.nodes[node_ref.index].ty
    }

    /// Position of the parameter with the given id in the signature.
    pub fn get_param_index(&self, param_id: ParamId) -> Option<usize> {
        self.params.iter().position(|p| p.id == param_id)
    }
}

impl std::fmt::Display for Fn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params_str = self
            .params
            .iter()
            .map(|p| format!("{}: {} id={}", p.name, p.ty, p.id.get_wrapped_id()))
            .collect::<Vec<String>>()
            .join(", ");
        writeln!(f, "fn {}({}) -> {} {{", self.name, params_str, self.ret_ty)?;
        for nr in self.node_refs() {
            let node = self.get_node(nr);
            if matches!(node.payload, NodePayload::GetParam(_)) {
                continue;
            }
            let prefix = if Some(nr) == self.ret_node_ref {
                "ret "
            } else {
                ""
            };
            writeln!(f, "  {}{}", prefix, node.to_string(self))?;
        }
        write!(f, "}}")
    }
}
