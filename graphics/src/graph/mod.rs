//! Frame render graph.
//!
//! The graph is rebuilt every cycle from scheduling commands and thrown
//! away after execution. There is no dependency solver: passes execute in
//! exactly the order they were added, and adding the same pass twice in one
//! frame is a contract violation. Producers are expected to schedule passes
//! in dependency order, which the fixed deferred roster makes trivial.
//!
//! Each node carries the pass's declared I/O so the frame's read and write
//! sets can be inspected while the graph is alive.

use firethorn_core::AccessToken;

use crate::error::{GraphicsError, GraphicsResult};
use crate::pipeline::{PassExecuteContext, PassId, PassRegistry};
use crate::resources::{Resource, ResourceHandle};
use crate::RenderBackend;

/// Declared resource I/O of one scheduled pass.
///
/// The write set doubles as the access token the pass uses for mutable
/// table lookups during execution.
#[derive(Debug, Clone, Default)]
pub struct PassIo {
    reads: Vec<ResourceHandle>,
    writes: AccessToken<Resource>,
}

impl PassIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resource the pass reads.
    pub fn read(&mut self, handle: ResourceHandle) -> &mut Self {
        if !self.reads.contains(&handle) {
            self.reads.push(handle);
        }
        self
    }

    /// Declares a resource the pass writes.
    pub fn write(&mut self, handle: ResourceHandle) -> &mut Self {
        self.writes.permit(handle);
        self
    }

    pub fn reads(&self) -> &[ResourceHandle] {
        &self.reads
    }

    /// Write set as an access token for mutable table lookups.
    pub fn writes(&self) -> &AccessToken<Resource> {
        &self.writes
    }
}

struct GraphNode {
    id: PassId,
    io: PassIo,
}

/// Ordered set of passes scheduled for one cycle.
#[derive(Default)]
pub struct RenderGraph {
    nodes: Vec<GraphNode>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pass to the execution order.
    ///
    /// # Panics
    ///
    /// Panics if the pass was already added this frame.
    pub fn add_pass(&mut self, id: PassId, io: PassIo) {
        assert!(
            !self.contains(id),
            "pass {:?} already added to the graph this frame",
            id
        );
        log::trace!(
            "graph: pass {:?} added at position {} ({} reads, {} writes)",
            id,
            self.nodes.len(),
            io.reads().len(),
            io.writes().len()
        );
        self.nodes.push(GraphNode { id, io });
    }

    pub fn contains(&self, id: PassId) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pass ids in execution order.
    pub fn pass_order(&self) -> impl Iterator<Item = PassId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Resources a scheduled pass declared it writes, or `None` if the pass
    /// is not in the graph.
    pub fn writes_of(&self, id: PassId) -> Option<Vec<ResourceHandle>> {
        self.node(id).map(|node| node.io.writes().handles().collect())
    }

    /// Resources a scheduled pass declared it reads, or `None` if the pass
    /// is not in the graph.
    pub fn reads_of(&self, id: PassId) -> Option<&[ResourceHandle]> {
        self.node(id).map(|node| node.io.reads())
    }

    /// Runs every pass in insertion order, stopping at the first failure.
    pub fn execute<B: RenderBackend>(
        &self,
        passes: &mut PassRegistry,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        for node in &self.nodes {
            log::trace!("graph: executing pass {:?}", node.id);
            if let Err(error) = passes.execute(node.id, ctx) {
                log::error!("graph: pass {:?} failed: {}", node.id, error);
                return Err(error.in_pass(node.id));
            }
        }
        Ok(())
    }

    /// Drops every node. Called after the cycle, successful or not.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn node(&self, id: PassId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firethorn_core::SlotTable;

    fn handles(count: usize) -> Vec<ResourceHandle> {
        let mut table = SlotTable::new();
        (0..count).map(|_| table.insert(dummy_resource())).collect()
    }

    fn dummy_resource() -> Resource {
        use crate::backend::BufferId;
        use crate::resources::Buffer;
        use crate::types::BufferUsage;
        Resource::Buffer(Buffer {
            label: "b".to_string(),
            size: 4,
            usage: BufferUsage::COPY_DST,
            gpu: BufferId(0),
            written: 0,
        })
    }

    #[test]
    fn test_insertion_order_is_execution_order() {
        let mut graph = RenderGraph::new();
        graph.add_pass(PassId::Geometry, PassIo::new());
        graph.add_pass(PassId::Lighting, PassIo::new());
        graph.add_pass(PassId::Composition, PassIo::new());

        let order: Vec<PassId> = graph.pass_order().collect();
        assert_eq!(
            order,
            vec![PassId::Geometry, PassId::Lighting, PassId::Composition]
        );
    }

    #[test]
    fn test_write_set_is_queryable_while_scheduled() {
        let handles = handles(3);
        let mut io = PassIo::new();
        io.read(handles[0]);
        io.write(handles[1]);
        io.write(handles[2]);

        let mut graph = RenderGraph::new();
        graph.add_pass(PassId::Geometry, io);

        let mut writes = graph.writes_of(PassId::Geometry).unwrap();
        writes.sort_by_key(|handle| handle.index());
        assert_eq!(writes, vec![handles[1], handles[2]]);
        assert_eq!(graph.reads_of(PassId::Geometry).unwrap(), &handles[0..1]);
        assert_eq!(graph.writes_of(PassId::Lighting), None);
    }

    #[test]
    #[should_panic(expected = "already added to the graph")]
    fn test_duplicate_pass_panics() {
        let mut graph = RenderGraph::new();
        graph.add_pass(PassId::Geometry, PassIo::new());
        graph.add_pass(PassId::Geometry, PassIo::new());
    }

    #[test]
    fn test_clear_empties_the_graph() {
        let mut graph = RenderGraph::new();
        graph.add_pass(PassId::Geometry, PassIo::new());
        assert!(!graph.is_empty());
        graph.clear();
        assert!(graph.is_empty());
        assert!(!graph.contains(PassId::Geometry));
    }

    #[test]
    fn test_reads_are_deduplicated() {
        let handles = handles(1);
        let mut io = PassIo::new();
        io.read(handles[0]).read(handles[0]);
        assert_eq!(io.reads().len(), 1);
    }
}
