//! Visitor dispatch over produced nodes.
//!
//! The parser notifies visitors in the order top level nodes become complete: the root
//! first, then every finished definition in source order. Dispatch is a plain match on
//! the node entity; implementors override the typed hooks they care about or take over
//! [visit](SyntaxVisitor::visit) entirely.

use super::{NodeId, SyntaxEntity, SyntaxNodeAllocator};

pub trait SyntaxVisitor<'src> {
    fn visit(&mut self, nodes: &dyn SyntaxNodeAllocator<'src>, node: NodeId) {
        match nodes.node(node).entity() {
            SyntaxEntity::Root => self.visit_root(nodes, node),
            SyntaxEntity::DefFunction => self.visit_function(nodes, node),
            SyntaxEntity::DefStruct => self.visit_struct(nodes, node),
            SyntaxEntity::DefTypeDef => self.visit_type_def(nodes, node),
            SyntaxEntity::DefVariable => self.visit_variable(nodes, node),
            SyntaxEntity::DefContextVariable => self.visit_context_variable(nodes, node),
            SyntaxEntity::DefAnnotation => self.visit_annotation(nodes, node),
            _ => self.visit_node(nodes, node),
        }
    }

    fn visit_root(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
    fn visit_function(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
    fn visit_struct(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
    fn visit_type_def(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
    fn visit_variable(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
    fn visit_context_variable(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
    fn visit_annotation(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}

    /// Fallback for entities without a dedicated hook.
    fn visit_node(&mut self, _nodes: &dyn SyntaxNodeAllocator<'src>, _node: NodeId) {}
}
