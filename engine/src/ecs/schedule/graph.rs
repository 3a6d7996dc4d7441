//! Dependency graphs between systems and strongly connected component detection.
//!
//! Systems declare explicit ordering edges ("run after X"). Those edges form a directed graph
//! whose nodes are system indices and whose edges point from a system to the systems it waits
//! for. A schedule can only run when that graph is acyclic, which is checked by splitting it
//! into strongly connected components: every component with more than one system, or a single
//! system waiting on itself, is a cycle.
//!
//! The component search is Pearce's single-pass variant of Tarjan's algorithm with one integer
//! of bookkeeping per node and an explicit work stack, so deep dependency chains never touch
//! the call stack. Components are produced in reverse topological order: every component comes
//! after the components it depends on, which is exactly an execution order.

use crate::ecs::{
    error::{Error, Result},
    schedule::SystemId,
};

/// One suspended visit on the explicit work stack.
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: usize,
    edge: usize,
    root: bool,
}

/// Split a graph into strongly connected components.
///
/// `neighbors[v]` lists the targets of the edges leaving `v`. Nodes are visited in index order
/// and neighbors in list order, so the output is deterministic. Each component starts with the
/// node that closed it.
///
/// ```rust,ignore
/// // 0 ─► 1 ─► 2 ─► 0,  3 ─► 2
/// let sccs = strongly_connected_components(&[vec![1], vec![2], vec![0], vec![2]]);
/// assert_eq!(sccs, vec![vec![0, 1, 2], vec![3]]);
/// ```
pub fn strongly_connected_components(neighbors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = neighbors.len();

    // 0 = unvisited, small values = visit index (lowered to the lowest reachable index),
    // values counting down from usize::MAX = finished component id.
    let mut rindex = vec![0usize; n];
    let mut index = 1usize;
    let mut component = usize::MAX;

    let mut stack: Vec<usize> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut components = Vec::new();

    for start in 0..n {
        if rindex[start] != 0 {
            continue;
        }
        rindex[start] = index;
        index += 1;
        frames.push(Frame {
            node: start,
            edge: 0,
            root: true,
        });

        while let Some(&frame) = frames.last() {
            let top = frames.len() - 1;
            let v = frame.node;

            match neighbors[v].get(frame.edge).copied() {
                Some(w) if rindex[w] == 0 => {
                    // Descend. The edge is looked at again once `w` finishes.
                    rindex[w] = index;
                    index += 1;
                    frames.push(Frame {
                        node: w,
                        edge: 0,
                        root: true,
                    });
                }
                Some(w) => {
                    if rindex[w] < rindex[v] {
                        rindex[v] = rindex[w];
                        frames[top].root = false;
                    }
                    frames[top].edge += 1;
                }
                None => {
                    frames.truncate(top);
                    if !frame.root {
                        stack.push(v);
                        continue;
                    }

                    let mut first = stack.len();
                    while first > 0 && rindex[stack[first - 1]] >= rindex[v] {
                        first -= 1;
                    }

                    let mut members = Vec::with_capacity(1 + stack.len() - first);
                    members.push(v);
                    index -= 1;
                    for w in stack.drain(first..) {
                        rindex[w] = component;
                        index -= 1;
                        members.push(w);
                    }
                    rindex[v] = component;
                    component -= 1;
                    components.push(members);
                }
            }
        }
    }

    components
}

/// Derived scheduling data for a set of systems and their explicit "after" edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Number of systems each system waits for.
    dependency_counts: Vec<usize>,

    /// For each system, the systems waiting for it.
    dependents: Vec<Vec<usize>>,

    /// A sequential execution order honoring every edge.
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph, rejecting cycles.
    ///
    /// `dependencies[v]` lists the systems `v` runs after, without duplicates. Every cycle is
    /// reported, not just the first one found.
    pub fn build(dependencies: &[Vec<usize>]) -> Result<Self> {
        let components = strongly_connected_components(dependencies);

        let cycles: Vec<Vec<SystemId>> = components
            .iter()
            .filter(|members| {
                members.len() > 1 || dependencies[members[0]].contains(&members[0])
            })
            .map(|members| {
                let mut cycle: Vec<_> = members.iter().map(|&m| SystemId::from(m)).collect();
                cycle.sort_unstable();
                cycle
            })
            .collect();
        if !cycles.is_empty() {
            return Err(Error::ConfigurationCycle { cycles });
        }

        let mut dependents = vec![Vec::new(); dependencies.len()];
        for (system, after) in dependencies.iter().enumerate() {
            for &dependency in after {
                dependents[dependency].push(system);
            }
        }

        Ok(Self {
            dependency_counts: dependencies.iter().map(Vec::len).collect(),
            dependents,
            order: components.into_iter().flatten().collect(),
        })
    }

    #[inline]
    pub fn dependency_counts(&self) -> &[usize] {
        &self.dependency_counts
    }

    #[inline]
    pub fn dependents(&self, system: usize) -> &[usize] {
        &self.dependents[system]
    }

    /// Every system, each one after all of its dependencies.
    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dependency_counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dependency_counts.is_empty()
    }
}

/// Explicit ordering edges collected as systems are registered, with a lazily rebuilt
/// [`DependencyGraph`].
#[derive(Debug, Default)]
pub struct Dependencies {
    /// For each system, the systems it runs after.
    after: Vec<Vec<usize>>,

    /// Cached graph, dropped whenever a system is added.
    graph: Option<DependencyGraph>,
}

impl Dependencies {
    /// Register the next system, returning its id.
    ///
    /// Every id in `after` and `before` must belong to an already registered system.
    pub fn add(&mut self, after: &[SystemId], before: &[SystemId]) -> Result<SystemId> {
        if let Some(&unknown) = after
            .iter()
            .chain(before)
            .find(|id| id.index() >= self.after.len())
        {
            return Err(Error::InvalidSystem(unknown));
        }

        let id = SystemId::from(self.after.len());
        let mut edges: Vec<usize> = Vec::with_capacity(after.len());
        for dependency in after {
            if !edges.contains(&dependency.index()) {
                edges.push(dependency.index());
            }
        }
        self.after.push(edges);

        for dependent in before {
            let edges = &mut self.after[dependent.index()];
            if !edges.contains(&id.index()) {
                edges.push(id.index());
            }
        }

        self.graph = None;
        Ok(id)
    }

    /// Add an ordering edge between two registered systems: `system` runs after `dependency`.
    pub fn add_edge(&mut self, system: SystemId, dependency: SystemId) -> Result<()> {
        for id in [system, dependency] {
            if id.index() >= self.after.len() {
                return Err(Error::InvalidSystem(id));
            }
        }
        let edges = &mut self.after[system.index()];
        if !edges.contains(&dependency.index()) {
            edges.push(dependency.index());
            self.graph = None;
        }
        Ok(())
    }

    /// The current graph, rebuilt when systems or edges were added since the last call.
    pub fn graph(&mut self) -> Result<&DependencyGraph> {
        if self.graph.is_none() {
            let graph = DependencyGraph::build(&self.after).inspect_err(|error| {
                log::error!("schedule rejected: {error}");
            })?;
            log::debug!(
                "rebuilt dependency graph for {} systems, order {:?}",
                graph.len(),
                graph.order()
            );
            self.graph = Some(graph);
        }

        match &self.graph {
            Some(graph) => Ok(graph),
            None => unreachable!("graph was built above"),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.after.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.after.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut components: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        for component in &mut components {
            component.sort_unstable();
        }
        components
    }

    fn ids(raw: &[usize]) -> Vec<SystemId> {
        raw.iter().map(|&i| SystemId::from(i)).collect()
    }

    #[test]
    fn empty_graph() {
        // Then
        assert!(strongly_connected_components(&[]).is_empty());
    }

    #[test]
    fn single_node() {
        // Given
        let graph = vec![vec![]];

        // Then
        assert_eq!(strongly_connected_components(&graph), vec![vec![0]]);
    }

    #[test]
    fn simple_cycle() {
        // Given
        let graph = vec![vec![1], vec![2], vec![0]];

        // Then
        assert_eq!(
            sorted(strongly_connected_components(&graph)),
            vec![vec![0, 1, 2]]
        );
    }

    #[test]
    fn linear_chain_is_emitted_dependencies_first() {
        // Given
        let graph = vec![vec![1], vec![2], vec![3], vec![]];

        // Then
        assert_eq!(
            strongly_connected_components(&graph),
            vec![vec![3], vec![2], vec![1], vec![0]]
        );
    }

    #[test]
    fn two_components() {
        // Given
        // 0 ⇄ 1 ─► 2 ⇄ 3
        let graph = vec![vec![1], vec![0, 2], vec![3], vec![2]];

        // Then
        assert_eq!(
            sorted(strongly_connected_components(&graph)),
            vec![vec![2, 3], vec![0, 1]]
        );
    }

    #[test]
    fn complex_graph() {
        // Given
        // Classic example: {0,1,2} {3,4} {5,6} {7}
        let graph = vec![
            vec![1],
            vec![2, 3],
            vec![0],
            vec![4],
            vec![3, 5],
            vec![6],
            vec![5, 7],
            vec![],
        ];

        // When
        let components = sorted(strongly_connected_components(&graph));

        // Then
        assert_eq!(
            components,
            vec![vec![7], vec![5, 6], vec![3, 4], vec![0, 1, 2]]
        );
    }

    #[test]
    fn revisited_nodes_keep_their_component() {
        // Given
        // 0 ─► 1 ─► 2 ─► 1, 0 ─► 2, 3 ─► 0
        let graph = vec![vec![1, 2], vec![2], vec![1], vec![0]];

        // Then
        assert_eq!(
            sorted(strongly_connected_components(&graph)),
            vec![vec![1, 2], vec![0], vec![3]]
        );
    }

    #[test]
    fn build_reports_every_cycle() {
        // Given
        // 0 ⇄ 1, 2 alone, 3 ─► 4 ─► 5 ─► 3
        let dependencies = vec![vec![1], vec![0], vec![], vec![4], vec![5], vec![3]];

        // When
        let error = DependencyGraph::build(&dependencies).unwrap_err();

        // Then
        assert_eq!(
            error,
            Error::ConfigurationCycle {
                cycles: vec![ids(&[0, 1]), ids(&[3, 4, 5])],
            }
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        // Given
        let dependencies = vec![vec![], vec![1]];

        // Then
        assert_eq!(
            DependencyGraph::build(&dependencies).unwrap_err(),
            Error::ConfigurationCycle {
                cycles: vec![ids(&[1])]
            }
        );
    }

    #[test]
    fn build_derives_counts_dependents_and_order() {
        // Given
        // 2 after 0 and 1, 3 after 2
        let dependencies = vec![vec![], vec![], vec![0, 1], vec![2]];

        // When
        let graph = DependencyGraph::build(&dependencies).unwrap();

        // Then
        assert_eq!(graph.dependency_counts(), &[0, 0, 2, 1]);
        assert_eq!(graph.dependents(0), &[2]);
        assert_eq!(graph.dependents(2), &[3]);
        let position = |s: usize| graph.order().iter().position(|&o| o == s).unwrap();
        assert!(position(0) < position(2));
        assert!(position(1) < position(2));
        assert!(position(2) < position(3));
    }

    #[test]
    fn dependencies_validate_and_invalidate() {
        // Given
        let mut dependencies = Dependencies::default();
        let a = dependencies.add(&[], &[]).unwrap();
        let b = dependencies.add(&[a, a], &[]).unwrap();
        assert_eq!(dependencies.graph().unwrap().dependency_counts(), &[0, 1]);

        // When
        let c = dependencies.add(&[], &[a]).unwrap();

        // Then
        assert_eq!(dependencies.graph().unwrap().dependency_counts(), &[1, 1, 0]);
        assert_eq!(
            dependencies.add(&[SystemId::new(9)], &[]),
            Err(Error::InvalidSystem(SystemId::new(9)))
        );
        assert_eq!(dependencies.len(), 3);

        // When
        dependencies.add_edge(c, b).unwrap();

        // Then
        assert!(matches!(
            dependencies.graph(),
            Err(Error::ConfigurationCycle { .. })
        ));
    }
}
