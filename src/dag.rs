//! Dependency DAG (base spec §4.3, component C3).
//!
//! Per design note §9, nodes live in an arena (`Vec<Node>`) addressed by
//! index, with both `dependencies` and `dependents` adjacency lists kept in
//! sync on every mutation. Traversal scratch state (`visited`, `in_stack`)
//! is local to each call, never stored on the node, so concurrent readers
//! are safe.

use rustc_hash::FxHashMap;

use crate::error::IntentcError;
use crate::parser::Intent;
use crate::registry::TargetRegistry;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    dependencies: Vec<usize>,
    dependents: Vec<usize>,
}

/// A status icon, as rendered by `visualize_with_status` (base spec §4.3:
/// `[✓ ✗ ○ ◐ !]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Built,
    Failed,
    Pending,
    Building,
    Outdated,
}

impl NodeStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            NodeStatus::Built => "\u{2713}",    // ✓
            NodeStatus::Failed => "\u{2717}",   // ✗
            NodeStatus::Pending => "\u{25cb}",  // ○
            NodeStatus::Building => "\u{25d0}", // ◐
            NodeStatus::Outdated => "!",
        }
    }
}

/// The intent dependency graph.
#[derive(Debug, Default)]
pub struct DependencyDag {
    nodes: Vec<Node>,
    index_of: FxHashMap<String, usize>,
}

impl DependencyDag {
    pub fn new() -> DependencyDag {
        DependencyDag::default()
    }

    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index_of.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
        });
        self.index_of.insert(name.to_string(), idx);
        idx
    }

    /// `from` depends on `to`. Keeps `dependencies`/`dependents` in sync.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if !self.nodes[from_idx].dependencies.contains(&to_idx) {
            self.nodes[from_idx].dependencies.push(to_idx);
        }
        if !self.nodes[to_idx].dependents.contains(&from_idx) {
            self.nodes[to_idx].dependents.push(from_idx);
        }
    }

    /// Build a graph from every intent in `registry`. Fails if any intent
    /// declares a dependency with no corresponding registered intent,
    /// naming the missing node and its requester.
    pub fn build_from_intents(registry: &TargetRegistry) -> Result<DependencyDag, IntentcError> {
        let mut dag = DependencyDag::new();
        let intents: Vec<&Intent> = registry
            .names()
            .filter_map(|n| registry.get(n))
            .map(|t| &t.intent)
            .collect();

        for intent in &intents {
            dag.add_node(&intent.name);
        }

        for intent in &intents {
            for dep in &intent.dependencies {
                if registry.get(dep).is_none() {
                    tracing::warn!(target = %intent.name, missing = %dep, "dependency graph references an unregistered target");
                    return Err(IntentcError::Graph(format!(
                        "missing dependency '{}' requested by '{}'",
                        dep, intent.name
                    )));
                }
                dag.add_edge(&intent.name, dep);
            }
        }

        tracing::debug!(nodes = dag.nodes.len(), "dependency graph built");
        Ok(dag)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        match self.index_of.get(name) {
            Some(&idx) => self.nodes[idx]
                .dependencies
                .iter()
                .map(|&i| self.nodes[i].name.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        match self.index_of.get(name) {
            Some(&idx) => self.nodes[idx]
                .dependents
                .iter()
                .map(|&i| self.nodes[i].name.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// DFS cycle detection with an explicit on-stack mark. Returns the
    /// on-stack path from the repeated node inclusive, closed by appending
    /// the repeated node again. A self-loop is a cycle of length 1 (the
    /// node, then the node again).
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut visited = vec![false; self.nodes.len()];
        let mut in_stack = vec![false; self.nodes.len()];
        let mut stack_path: Vec<usize> = Vec::new();

        for start in 0..self.nodes.len() {
            if visited[start] {
                continue;
            }
            if let Some(cycle) = self.dfs_detect_cycle(start, &mut visited, &mut in_stack, &mut stack_path) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_detect_cycle(
        &self,
        node: usize,
        visited: &mut [bool],
        in_stack: &mut [bool],
        stack_path: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        visited[node] = true;
        in_stack[node] = true;
        stack_path.push(node);

        for &dep in &self.nodes[node].dependencies {
            if in_stack[dep] {
                let start = stack_path.iter().position(|&n| n == dep).expect("on stack");
                let mut cycle: Vec<String> = stack_path[start..]
                    .iter()
                    .map(|&i| self.nodes[i].name.clone())
                    .collect();
                cycle.push(self.nodes[dep].name.clone());
                return Some(cycle);
            }
            if !visited[dep] {
                if let Some(cycle) = self.dfs_detect_cycle(dep, visited, in_stack, stack_path) {
                    return Some(cycle);
                }
            }
        }

        in_stack[node] = false;
        stack_path.pop();
        None
    }

    /// Post-order DFS from every node, emitting dependencies before
    /// dependents. Fails cleanly, naming the cycle, when one exists.
    pub fn topological_sort(&self) -> Result<Vec<String>, IntentcError> {
        if let Some(cycle) = self.detect_cycle() {
            return Err(IntentcError::Graph(format!(
                "cycle detected: {}",
                cycle.join(" -> ")
            )));
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for start in 0..self.nodes.len() {
            if !visited[start] {
                self.dfs_topo(start, &mut visited, &mut order);
            }
        }
        Ok(order)
    }

    fn dfs_topo(&self, node: usize, visited: &mut [bool], order: &mut Vec<String>) {
        visited[node] = true;
        for &dep in &self.nodes[node].dependencies {
            if !visited[dep] {
                self.dfs_topo(dep, visited, order);
            }
        }
        order.push(self.nodes[node].name.clone());
    }

    /// `name` and every transitive dependent of `name` (those that would be
    /// invalidated if `name` were rebuilt or removed).
    pub fn find_affected_nodes(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.index_of.get(name) else {
            return Vec::new();
        };
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        let mut affected = Vec::new();
        seen[start] = true;
        while let Some(node) = stack.pop() {
            affected.push(self.nodes[node].name.clone());
            for &dependent in &self.nodes[node].dependents {
                if !seen[dependent] {
                    seen[dependent] = true;
                    stack.push(dependent);
                }
            }
        }
        affected
    }

    /// ASCII tree visualization rooted at nodes with no outgoing dependency
    /// edges, descending through `dependents`.
    pub fn visualize(&self) -> String {
        self.visualize_with_status(|_| None)
    }

    pub fn visualize_with_status<F>(&self, status_fn: F) -> String
    where
        F: Fn(&str) -> Option<NodeStatus>,
    {
        let roots: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].dependencies.is_empty())
            .collect();

        let mut out = String::new();
        let mut visiting = Vec::new();
        for &root in &roots {
            self.render_node(root, "", true, &status_fn, &mut out, &mut visiting);
        }
        out
    }

    fn render_node<F>(
        &self,
        node: usize,
        prefix: &str,
        is_last: bool,
        status_fn: &F,
        out: &mut String,
        visiting: &mut Vec<usize>,
    ) where
        F: Fn(&str) -> Option<NodeStatus>,
    {
        let connector = if prefix.is_empty() {
            ""
        } else if is_last {
            "\u{2514}\u{2500}\u{2500} " // └──
        } else {
            "\u{251c}\u{2500}\u{2500} " // ├──
        };
        let label = match status_fn(&self.nodes[node].name) {
            Some(status) => format!("[{}] {}", status.icon(), self.nodes[node].name),
            None => self.nodes[node].name.clone(),
        };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&label);
        out.push('\n');

        if visiting.contains(&node) {
            return; // avoid infinite descent on diamond-shaped graphs
        }
        visiting.push(node);

        let child_prefix = if prefix.is_empty() {
            String::new()
        } else if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}\u{2502}   ")
        };
        let next_prefix = if prefix.is_empty() { "" } else { &child_prefix };

        let dependents = &self.nodes[node].dependents;
        for (i, &child) in dependents.iter().enumerate() {
            let last_child = i == dependents.len() - 1;
            self.render_node(child, next_prefix, last_child, status_fn, out, visiting);
        }

        visiting.pop();
    }
}
