//! Tree rendering for debugging and tests.

use super::{NodeId, SyntaxNodeAllocator, SyntaxNodeData, TokenSlot};
use ptree::TreeItem;
use std::borrow::Cow;

/// A printable view over one node of a tree.
pub struct TreeDisplay<'a, 'src> {
    nodes: &'a dyn SyntaxNodeAllocator<'src>,
    node: NodeId,
}

impl<'a, 'src> TreeDisplay<'a, 'src> {
    pub fn new(nodes: &'a dyn SyntaxNodeAllocator<'src>, node: NodeId) -> Self {
        Self { nodes, node }
    }

    pub fn print(&self) -> Result<(), std::io::Error> {
        ptree::print_tree(self)
    }

    fn summary(&self) -> String {
        let node = self.nodes.node(self.node);
        let main_token = match &node.data {
            SyntaxNodeData::TypeDef { .. }
            | SyntaxNodeData::Struct { .. }
            | SyntaxNodeData::StructMember { .. }
            | SyntaxNodeData::Variable { .. }
            | SyntaxNodeData::ContextVariable { .. }
            | SyntaxNodeData::Function { .. }
            | SyntaxNodeData::FunctionArgument { .. }
            | SyntaxNodeData::AnnotationAttribute { .. } => Some(node.token(TokenSlot::Name)),
            SyntaxNodeData::Value { .. } => Some(node.token(TokenSlot::Value)),
            SyntaxNodeData::GetMember { .. } => Some(node.token(TokenSlot::Member)),
            SyntaxNodeData::Call { .. } => Some(node.token(TokenSlot::Function)),
            SyntaxNodeData::UnaryOperation { .. } | SyntaxNodeData::BinaryOperation { .. } => {
                Some(node.token(TokenSlot::Operation))
            }
            _ => None,
        };

        match main_token {
            Some(token) if !token.text.is_empty() => {
                format!("{:?} '{}'", node.entity(), token.text)
            }
            _ => format!("{:?}", node.entity()),
        }
    }
}

impl Clone for TreeDisplay<'_, '_> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            node: self.node,
        }
    }
}

impl TreeItem for TreeDisplay<'_, '_> {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.summary())
    }

    fn children(&self) -> Cow<[Self::Child]> {
        let mut result = Vec::new();
        let mut current = self.nodes.node(self.node).child;
        while let Some(id) = current {
            result.push(Self {
                nodes: self.nodes,
                node: id,
            });
            current = self.nodes.node(id).sibling;
        }
        Cow::from(result)
    }
}
