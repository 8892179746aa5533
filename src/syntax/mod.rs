//! The syntax tree data model.
//!
//! Nodes form a sibling linked n-ary tree: `child` starts the ordered child list,
//! iteration follows `sibling` until the chain ends, and `annotation` references the
//! chain of annotation nodes consumed by a definition. Every node lives inside a
//! [SyntaxNodeAllocator] which hands out stable [NodeId] handles; ownership of a subtree
//! follows its parent and the whole tree belongs to the allocator that created it.

mod arena;
mod printer;
mod visitor;

pub use arena::{HostArena, TrackingArena};
pub use printer::TreeDisplay;
pub use visitor::SyntaxVisitor;

use crate::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Discriminator of every node variant.
pub enum SyntaxEntity {
    Root,

    DefTypeDef,
    DefStruct,
    DefStructMember,
    DefVariable,
    DefContextVariable,
    DefFunction,
    DefFunctionArgument,
    DefFunctionBody,
    DefExplicitScope,
    DefAnnotation,
    DefAnnotationAttribute,

    ExpValue,
    ExpGetMember,
    ExpCall,
    ExpCallArg,
    ExpVariable,
    ExpAssignment,
    ExpExpression,
    ExpUnaryOperation,
    ExpBinaryOperation,
    ExpExplicitScope,
    ExpCondition,
    ExpBranch,
    ExpLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A stable handle to a node inside its allocator.
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone)]
/// Variant payload of a syntax node. Tokens borrow their text from the source buffer.
pub enum SyntaxNodeData<'src> {
    Root,
    TypeDef {
        name: Token<'src>,
        base_type: Token<'src>,
        is_alias: bool,
    },
    Struct {
        name: Token<'src>,
    },
    StructMember {
        name: Token<'src>,
        member_type: Token<'src>,
    },
    Variable {
        name: Token<'src>,
        var_type: Token<'src>,
    },
    ContextVariable {
        name: Token<'src>,
        var_type: Token<'src>,
    },
    Function {
        name: Token<'src>,
        result_type: Token<'src>,
    },
    FunctionArgument {
        name: Token<'src>,
        arg_type: Token<'src>,
    },
    FunctionBody,
    ExplicitScope,
    Annotation,
    AnnotationAttribute {
        name: Token<'src>,
        value: Token<'src>,
    },
    Value {
        value: Token<'src>,
    },
    GetMember {
        member: Token<'src>,
    },
    Call {
        function: Token<'src>,
    },
    CallArg,
    ExpVariable,
    Assignment,
    Expression,
    UnaryOperation {
        operation: Token<'src>,
    },
    BinaryOperation {
        operation: Token<'src>,
    },
    ExpressionScope,
    Condition,
    Branch,
    Loop,
}

#[derive(Debug, Clone)]
/// A tree node: the shared link header plus the variant payload.
pub struct SyntaxNode<'src> {
    pub child: Option<NodeId>,
    pub sibling: Option<NodeId>,
    pub annotation: Option<NodeId>,
    pub data: SyntaxNodeData<'src>,
}

/// Field selector used by the rule engine's token storing success actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSlot {
    Name,
    Type,
    BaseType,
    ResultType,
    Value,
    Member,
    Operation,
    Function,
}

/// Field selector for boolean storing success actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSlot {
    IsAlias,
}

impl<'src> SyntaxNodeData<'src> {
    /// A default initialized payload for the given entity, used when a rule group
    /// allocates its child or sibling node before matching.
    pub fn empty(entity: SyntaxEntity) -> Self {
        let token = Token::default();
        match entity {
            SyntaxEntity::Root => Self::Root,
            SyntaxEntity::DefTypeDef => Self::TypeDef {
                name: token,
                base_type: token,
                is_alias: false,
            },
            SyntaxEntity::DefStruct => Self::Struct { name: token },
            SyntaxEntity::DefStructMember => Self::StructMember {
                name: token,
                member_type: token,
            },
            SyntaxEntity::DefVariable => Self::Variable {
                name: token,
                var_type: token,
            },
            SyntaxEntity::DefContextVariable => Self::ContextVariable {
                name: token,
                var_type: token,
            },
            SyntaxEntity::DefFunction => Self::Function {
                name: token,
                result_type: token,
            },
            SyntaxEntity::DefFunctionArgument => Self::FunctionArgument {
                name: token,
                arg_type: token,
            },
            SyntaxEntity::DefFunctionBody => Self::FunctionBody,
            SyntaxEntity::DefExplicitScope => Self::ExplicitScope,
            SyntaxEntity::DefAnnotation => Self::Annotation,
            SyntaxEntity::DefAnnotationAttribute => Self::AnnotationAttribute {
                name: token,
                value: token,
            },
            SyntaxEntity::ExpValue => Self::Value { value: token },
            SyntaxEntity::ExpGetMember => Self::GetMember { member: token },
            SyntaxEntity::ExpCall => Self::Call { function: token },
            SyntaxEntity::ExpCallArg => Self::CallArg,
            SyntaxEntity::ExpVariable => Self::ExpVariable,
            SyntaxEntity::ExpAssignment => Self::Assignment,
            SyntaxEntity::ExpExpression => Self::Expression,
            SyntaxEntity::ExpUnaryOperation => Self::UnaryOperation { operation: token },
            SyntaxEntity::ExpBinaryOperation => Self::BinaryOperation { operation: token },
            SyntaxEntity::ExpExplicitScope => Self::ExpressionScope,
            SyntaxEntity::ExpCondition => Self::Condition,
            SyntaxEntity::ExpBranch => Self::Branch,
            SyntaxEntity::ExpLoop => Self::Loop,
        }
    }

    pub fn entity(&self) -> SyntaxEntity {
        match self {
            Self::Root => SyntaxEntity::Root,
            Self::TypeDef { .. } => SyntaxEntity::DefTypeDef,
            Self::Struct { .. } => SyntaxEntity::DefStruct,
            Self::StructMember { .. } => SyntaxEntity::DefStructMember,
            Self::Variable { .. } => SyntaxEntity::DefVariable,
            Self::ContextVariable { .. } => SyntaxEntity::DefContextVariable,
            Self::Function { .. } => SyntaxEntity::DefFunction,
            Self::FunctionArgument { .. } => SyntaxEntity::DefFunctionArgument,
            Self::FunctionBody => SyntaxEntity::DefFunctionBody,
            Self::ExplicitScope => SyntaxEntity::DefExplicitScope,
            Self::Annotation => SyntaxEntity::DefAnnotation,
            Self::AnnotationAttribute { .. } => SyntaxEntity::DefAnnotationAttribute,
            Self::Value { .. } => SyntaxEntity::ExpValue,
            Self::GetMember { .. } => SyntaxEntity::ExpGetMember,
            Self::Call { .. } => SyntaxEntity::ExpCall,
            Self::CallArg => SyntaxEntity::ExpCallArg,
            Self::ExpVariable => SyntaxEntity::ExpVariable,
            Self::Assignment => SyntaxEntity::ExpAssignment,
            Self::Expression => SyntaxEntity::ExpExpression,
            Self::UnaryOperation { .. } => SyntaxEntity::ExpUnaryOperation,
            Self::BinaryOperation { .. } => SyntaxEntity::ExpBinaryOperation,
            Self::ExpressionScope => SyntaxEntity::ExpExplicitScope,
            Self::Condition => SyntaxEntity::ExpCondition,
            Self::Branch => SyntaxEntity::ExpBranch,
            Self::Loop => SyntaxEntity::ExpLoop,
        }
    }
}

impl<'src> SyntaxNode<'src> {
    pub fn new(data: SyntaxNodeData<'src>) -> Self {
        Self {
            child: None,
            sibling: None,
            annotation: None,
            data,
        }
    }

    pub fn entity(&self) -> SyntaxEntity {
        self.data.entity()
    }

    /// Read a token field. Unset fields read as the default token.
    pub fn token(&self, slot: TokenSlot) -> Token<'src> {
        match (&self.data, slot) {
            (SyntaxNodeData::TypeDef { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::TypeDef { base_type, .. }, TokenSlot::BaseType) => *base_type,
            (SyntaxNodeData::Struct { name }, TokenSlot::Name) => *name,
            (SyntaxNodeData::StructMember { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::StructMember { member_type, .. }, TokenSlot::Type) => *member_type,
            (SyntaxNodeData::Variable { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::Variable { var_type, .. }, TokenSlot::Type) => *var_type,
            (SyntaxNodeData::ContextVariable { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::ContextVariable { var_type, .. }, TokenSlot::Type) => *var_type,
            (SyntaxNodeData::Function { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::Function { result_type, .. }, TokenSlot::ResultType) => *result_type,
            (SyntaxNodeData::FunctionArgument { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::FunctionArgument { arg_type, .. }, TokenSlot::Type) => *arg_type,
            (SyntaxNodeData::AnnotationAttribute { name, .. }, TokenSlot::Name) => *name,
            (SyntaxNodeData::AnnotationAttribute { value, .. }, TokenSlot::Value) => *value,
            (SyntaxNodeData::Value { value }, TokenSlot::Value) => *value,
            (SyntaxNodeData::GetMember { member }, TokenSlot::Member) => *member,
            (SyntaxNodeData::Call { function }, TokenSlot::Function) => *function,
            (SyntaxNodeData::UnaryOperation { operation }, TokenSlot::Operation) => *operation,
            (SyntaxNodeData::BinaryOperation { operation }, TokenSlot::Operation) => *operation,
            _ => {
                debug_assert!(false, "token slot {:?} not present on {:?}", slot, self.entity());
                Token::default()
            }
        }
    }

    /// Store a token field.
    pub fn store_token(&mut self, slot: TokenSlot, token: Token<'src>) {
        match (&mut self.data, slot) {
            (SyntaxNodeData::TypeDef { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::TypeDef { base_type, .. }, TokenSlot::BaseType) => *base_type = token,
            (SyntaxNodeData::Struct { name }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::StructMember { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::StructMember { member_type, .. }, TokenSlot::Type) => {
                *member_type = token
            }
            (SyntaxNodeData::Variable { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::Variable { var_type, .. }, TokenSlot::Type) => *var_type = token,
            (SyntaxNodeData::ContextVariable { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::ContextVariable { var_type, .. }, TokenSlot::Type) => {
                *var_type = token
            }
            (SyntaxNodeData::Function { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::Function { result_type, .. }, TokenSlot::ResultType) => {
                *result_type = token
            }
            (SyntaxNodeData::FunctionArgument { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::FunctionArgument { arg_type, .. }, TokenSlot::Type) => {
                *arg_type = token
            }
            (SyntaxNodeData::AnnotationAttribute { name, .. }, TokenSlot::Name) => *name = token,
            (SyntaxNodeData::AnnotationAttribute { value, .. }, TokenSlot::Value) => {
                *value = token
            }
            (SyntaxNodeData::Value { value }, TokenSlot::Value) => *value = token,
            (SyntaxNodeData::GetMember { member }, TokenSlot::Member) => *member = token,
            (SyntaxNodeData::Call { function }, TokenSlot::Function) => *function = token,
            (SyntaxNodeData::UnaryOperation { operation }, TokenSlot::Operation) => {
                *operation = token
            }
            (SyntaxNodeData::BinaryOperation { operation }, TokenSlot::Operation) => {
                *operation = token
            }
            _ => debug_assert!(false, "token slot {:?} not present on {:?}", slot, self.entity()),
        }
    }

    pub fn set_flag(&mut self, slot: FlagSlot, value: bool) {
        match (&mut self.data, slot) {
            (SyntaxNodeData::TypeDef { is_alias, .. }, FlagSlot::IsAlias) => *is_alias = value,
            _ => debug_assert!(false, "flag slot {:?} not present on {:?}", slot, self.entity()),
        }
    }
}

/// Allocation contract for syntax nodes. Every node of a tree is created through one
/// allocator and destroyed through the same allocator.
pub trait SyntaxNodeAllocator<'src> {
    fn create(&mut self, data: SyntaxNodeData<'src>) -> NodeId;
    fn destroy(&mut self, id: NodeId);
    fn node(&self, id: NodeId) -> &SyntaxNode<'src>;
    fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode<'src>;
    /// Allocations minus deallocations; zero when every node has been released.
    fn live_count(&self) -> u32;
}

/// Append `child` at the end of `parent`'s child list.
pub fn append_child<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    parent: NodeId,
    child: NodeId,
) {
    match nodes.node(parent).child {
        None => nodes.node_mut(parent).child = Some(child),
        Some(first) => {
            let last = last_sibling(nodes, first);
            nodes.node_mut(last).sibling = Some(child);
        }
    }
}

/// Append `sibling` at the end of `node`'s sibling chain.
pub fn append_sibling<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
    sibling: NodeId,
) {
    let last = last_sibling(nodes, node);
    nodes.node_mut(last).sibling = Some(sibling);
}

/// Append to an optional chain head, assigning the head when the chain is empty.
pub fn append_sibling_or_assign<'src>(
    nodes: &mut dyn SyntaxNodeAllocator<'src>,
    chain: &mut Option<NodeId>,
    node: NodeId,
) {
    match *chain {
        None => *chain = Some(node),
        Some(head) => append_sibling(nodes, head, node),
    }
}

pub fn last_sibling<'src>(nodes: &dyn SyntaxNodeAllocator<'src>, mut id: NodeId) -> NodeId {
    while let Some(next) = nodes.node(id).sibling {
        id = next;
    }
    id
}

/// Iterator over a sibling chain.
pub struct SiblingIter<'a, 'src> {
    nodes: &'a dyn SyntaxNodeAllocator<'src>,
    current: Option<NodeId>,
}

impl Iterator for SiblingIter<'_, '_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.nodes.node(id).sibling;
        Some(id)
    }
}

/// Iterate the child list of a node.
pub fn children<'a, 'src>(
    nodes: &'a dyn SyntaxNodeAllocator<'src>,
    parent: NodeId,
) -> SiblingIter<'a, 'src> {
    SiblingIter {
        nodes,
        current: nodes.node(parent).child,
    }
}

/// Iterate a sibling chain starting at `head`.
pub fn siblings<'a, 'src>(
    nodes: &'a dyn SyntaxNodeAllocator<'src>,
    head: Option<NodeId>,
) -> SiblingIter<'a, 'src> {
    SiblingIter {
        nodes,
        current: head,
    }
}

/// Destroy a node together with its children, annotations and the sibling chains hanging
/// off them. The node's own sibling chain is destroyed as well.
pub fn destroy_chain<'src>(nodes: &mut dyn SyntaxNodeAllocator<'src>, head: NodeId) {
    let mut current = Some(head);
    while let Some(id) = current {
        let node = nodes.node(id);
        let child = node.child;
        let annotation = node.annotation;
        current = node.sibling;

        if let Some(child) = child {
            destroy_chain(nodes, child);
        }
        if let Some(annotation) = annotation {
            destroy_chain(nodes, annotation);
        }
        nodes.destroy(id);
    }
}

/// Destroy a single node and everything reachable below it, leaving its siblings alone.
pub fn destroy_subtree<'src>(nodes: &mut dyn SyntaxNodeAllocator<'src>, id: NodeId) {
    let node = nodes.node(id);
    let child = node.child;
    let annotation = node.annotation;

    if let Some(child) = child {
        destroy_chain(nodes, child);
    }
    if let Some(annotation) = annotation {
        destroy_chain(nodes, annotation);
    }
    nodes.destroy(id);
}
