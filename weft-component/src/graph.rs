// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Core-instance dependency graph.
//!
//! `instantiate` instances depend on every instance passed as an argument;
//! `from-exports` instances depend on whichever instances originally
//! sourced the items they re-expose, reconstructed from the tagged core
//! index spaces. The graph drives ordered (or layered parallel)
//! instantiation.

use log::debug;

use crate::prelude::*;
use crate::state::CoreFuncEntry;
use crate::validate::ValidatedComponent;
use weft_format::component::{CoreInstance, CoreSort};

/// What kind of core instance a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceNodeKind {
    /// Instantiation of a core module.
    Instantiate {
        /// The module being instantiated.
        module_idx: u32,
    },
    /// A synthetic bundle of existing items.
    FromExports,
}

/// One core instance in the graph.
#[derive(Debug, Clone)]
pub struct InstanceNode {
    /// Node kind.
    pub kind: InstanceNodeKind,
    /// Instances this one depends on, deduplicated, in first-seen order.
    pub deps: Vec<u32>,
    /// Export names this instance exposes (known only for from-exports
    /// nodes; module exports are opaque at this layer).
    pub exports: Vec<String>,
}

/// The dependency graph over a component's core instances.
#[derive(Debug, Clone, Default)]
pub struct InstanceGraph {
    nodes: Vec<InstanceNode>,
}

impl InstanceGraph {
    /// Build the graph from a validated component.
    pub fn from_validated(validated: &ValidatedComponent) -> Self {
        let scope = &validated.scope;
        let mut nodes = Vec::with_capacity(validated.component.core_instances.len());

        for (idx, instance) in validated.component.core_instances.iter().enumerate() {
            let node = match instance {
                CoreInstance::Instantiate { module_idx, args } => {
                    let mut deps = Vec::new();
                    for arg in args {
                        push_dep(&mut deps, arg.instance_idx);
                    }
                    InstanceNode {
                        kind: InstanceNodeKind::Instantiate { module_idx: *module_idx },
                        deps,
                        exports: Vec::new(),
                    }
                },
                CoreInstance::FromExports(exports) => {
                    let mut deps = Vec::new();
                    let mut names = Vec::with_capacity(exports.len());
                    for export in exports {
                        names.push(export.name.clone());
                        let origin = match export.sort {
                            CoreSort::Func => {
                                match scope.core_funcs.get(export.index as usize) {
                                    Some(CoreFuncEntry::AliasExport { instance_idx, .. }) => {
                                        Some(*instance_idx)
                                    },
                                    _ => None,
                                }
                            },
                            CoreSort::Table => scope.core_tables.get(export.index as usize).copied(),
                            CoreSort::Memory => {
                                scope.core_memories.get(export.index as usize).copied()
                            },
                            CoreSort::Global => {
                                scope.core_globals.get(export.index as usize).copied()
                            },
                            CoreSort::Module | CoreSort::Instance | CoreSort::Type => None,
                        };
                        if let Some(origin) = origin {
                            push_dep(&mut deps, origin);
                        }
                    }
                    InstanceNode { kind: InstanceNodeKind::FromExports, deps, exports: names }
                },
            };
            debug!("core instance {}: {:?} deps {:?}", idx, node.kind, node.deps);
            nodes.push(node);
        }

        Self { nodes }
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The dependencies of an instance.
    pub fn deps_of(&self, index: u32) -> Option<&[u32]> {
        self.nodes.get(index as usize).map(|node| node.deps.as_slice())
    }

    /// The known export names of an instance.
    pub fn exports_of(&self, index: u32) -> Option<&[String]> {
        self.nodes.get(index as usize).map(|node| node.exports.as_slice())
    }

    /// Find the instance exposing the named export, if any.
    pub fn find_by_export(&self, name: &str) -> Option<u32> {
        self.nodes
            .iter()
            .position(|node| node.exports.iter().any(|export| export == name))
            .map(|idx| idx as u32)
    }

    /// Kahn's algorithm: a topological order over the instances, or a
    /// cycle error.
    pub fn topological_order(&self) -> Result<Vec<u32>> {
        let len = self.nodes.len();
        let mut in_degree = vec![0u32; len];
        // dependents[d] lists the nodes that wait on d.
        let mut dependents: Vec<Vec<u32>> = vec![Vec::new(); len];

        for (idx, node) in self.nodes.iter().enumerate() {
            for dep in &node.deps {
                if (*dep as usize) < len {
                    in_degree[idx] += 1;
                    dependents[*dep as usize].push(idx as u32);
                }
            }
        }

        let mut queue: VecDeque<u32> = (0..len as u32).filter(|i| in_degree[*i as usize] == 0).collect();
        let mut order = Vec::with_capacity(len);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for dependent in &dependents[node as usize] {
                in_degree[*dependent as usize] -= 1;
                if in_degree[*dependent as usize] == 0 {
                    queue.push_back(*dependent);
                }
            }
        }

        if order.len() != len {
            return Err(Error::validate(
                ErrorKind::CycleDetected,
                "core instance dependencies form a cycle",
            ));
        }
        Ok(order)
    }

    /// Instantiation layers: a from-exports node sits at layer 0; an
    /// instantiate node sits one past its deepest dependency.
    pub fn instantiation_layers(&self) -> Result<Vec<u32>> {
        let order = self.topological_order()?;
        let mut layers = vec![0u32; self.nodes.len()];
        for idx in order {
            let node = &self.nodes[idx as usize];
            layers[idx as usize] = match node.kind {
                InstanceNodeKind::FromExports => 0,
                InstanceNodeKind::Instantiate { .. } => node
                    .deps
                    .iter()
                    .filter(|dep| (**dep as usize) < layers.len())
                    .map(|dep| layers[*dep as usize])
                    .max()
                    .map_or(0, |deepest| deepest + 1),
            };
        }
        Ok(layers)
    }
}

fn push_dep(deps: &mut Vec<u32>, dep: u32) {
    if !deps.contains(&dep) {
        deps.push(dep);
    }
}
