// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Stage dependency DAG
//!
//! The catalog is acyclic by construction (inputs may only reference
//! strictly earlier stages), but the invariant is asserted once at
//! startup so a bad catalog edit fails loudly before any stage runs.
//! Also renders the graph for `reconflow plan`.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use crate::errors::{ReconflowError, ReconflowResult};
use crate::pipeline::{ArtifactKey, Invocation, StageDescriptor};

/// Validated dependency graph over a stage catalog
pub struct StageDag {
    graph: DiGraph<usize, ()>,
    node_to_name: HashMap<NodeIndex, &'static str>,
}

impl StageDag {
    /// Build and validate the DAG for a catalog.
    ///
    /// Rejects non-contiguous indices, duplicate names or output keys,
    /// inputs with no producer, and inputs produced by the same or a
    /// later stage.
    pub fn build(catalog: &[StageDescriptor]) -> ReconflowResult<Self> {
        let invalid = |reason: String| ReconflowError::InvalidCatalog { reason };

        let mut names = HashSet::new();
        let mut outputs: HashSet<&str> = HashSet::new();
        for (position, stage) in catalog.iter().enumerate() {
            if stage.index != position + 1 {
                return Err(invalid(format!(
                    "stage '{}' has index {} at position {}",
                    stage.name,
                    stage.index,
                    position + 1
                )));
            }
            if !names.insert(stage.name) {
                return Err(invalid(format!("duplicate stage name '{}'", stage.name)));
            }
            if let Some(out) = stage.output {
                if !outputs.insert(out.key()) {
                    return Err(invalid(format!("duplicate output artifact '{}'", out)));
                }
            }
        }

        let producers = producer_map(catalog);

        let mut graph = DiGraph::new();
        let mut nodes = Vec::with_capacity(catalog.len());
        let mut node_to_name = HashMap::new();

        for stage in catalog {
            let node = graph.add_node(stage.index);
            node_to_name.insert(node, stage.name);
            nodes.push(node);
        }

        for stage in catalog {
            for input in &stage.inputs {
                let producer = producers.get(&input.key).ok_or_else(|| {
                    invalid(format!(
                        "stage '{}' consumes '{}' which no stage produces",
                        stage.name, input.key
                    ))
                })?;

                if producer.index >= stage.index {
                    return Err(invalid(format!(
                        "stage '{}' consumes '{}' which is produced by stage '{}' at or after it",
                        stage.name, input.key, producer.name
                    )));
                }

                graph.add_edge(nodes[producer.index - 1], nodes[stage.index - 1], ());
            }
        }

        if toposort(&graph, None).is_err() {
            return Err(invalid("dependency cycle detected".to_string()));
        }

        Ok(Self { graph, node_to_name })
    }

    /// Numbered execution plan with tool, policy, timeout and dependencies
    pub fn to_text(&self, catalog: &[StageDescriptor]) -> String {
        let producers = producer_map(catalog);
        let mut out = String::new();

        for stage in catalog {
            let what = match &stage.invocation {
                Invocation::Tool(tool) => tool.bin,
                Invocation::Merge(_) => "merge",
            };
            let policy = match stage.failure_policy {
                crate::pipeline::FailurePolicy::Fatal => "fatal",
                crate::pipeline::FailurePolicy::Skippable => "skippable",
            };

            out.push_str(&format!(
                "{:2}. {} ({}, {}, {}s)",
                stage.index,
                stage.name,
                what,
                policy,
                stage.timeout.as_secs()
            ));

            let deps: Vec<&str> = stage
                .inputs
                .iter()
                .filter_map(|input| producers.get(&input.key).map(|s| s.name))
                .collect();
            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }

    /// Generate a Mermaid diagram of the DAG
    pub fn to_mermaid(&self, catalog: &[StageDescriptor]) -> String {
        let producers = producer_map(catalog);
        let mut out = String::from("graph TD\n");

        for stage in catalog {
            out.push_str(&format!("    {}[{}]\n", stage.name, stage.name));
        }

        for stage in catalog {
            for input in &stage.inputs {
                if let Some(producer) = producers.get(&input.key) {
                    out.push_str(&format!("    {} --> {}\n", producer.name, stage.name));
                }
            }
        }

        out
    }

    /// Generate a DOT diagram of the DAG
    pub fn to_dot(&self, catalog: &[StageDescriptor]) -> String {
        let producers = producer_map(catalog);
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for stage in catalog {
            out.push_str(&format!("    \"{}\";\n", stage.name));
        }

        for stage in catalog {
            for input in &stage.inputs {
                if let Some(producer) = producers.get(&input.key) {
                    out.push_str(&format!("    \"{}\" -> \"{}\";\n", producer.name, stage.name));
                }
            }
        }

        out.push_str("}\n");
        out
    }

    /// Number of dependency edges (used by the plan footer)
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Stage names in validated topological order
    pub fn topological_names(&self) -> Vec<&'static str> {
        // build() already rejected cycles
        toposort(&self.graph, None)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|node| self.node_to_name.get(&node).copied())
            .collect()
    }
}

fn producer_map(catalog: &[StageDescriptor]) -> HashMap<ArtifactKey, &StageDescriptor> {
    catalog
        .iter()
        .filter_map(|stage| stage.output.map(|out| (out, stage)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::pipeline::{
        build_catalog, FailurePolicy, MergeRecipe, StageInput,
    };
    use std::time::Duration;

    const ALPHA: ArtifactKey = ArtifactKey::new("01_alpha", "output/01_alpha.txt");
    const BETA: ArtifactKey = ArtifactKey::new("02_beta", "output/02_beta.txt");

    fn merge_stage(
        index: usize,
        name: &'static str,
        inputs: Vec<StageInput>,
        output: ArtifactKey,
    ) -> StageDescriptor {
        StageDescriptor {
            index,
            name,
            inputs,
            output: Some(output),
            invocation: Invocation::Merge(MergeRecipe::sorted()),
            failure_policy: FailurePolicy::Skippable,
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_full_catalog_is_valid() {
        let catalog = build_catalog("example.com", &RunConfig::default());
        let dag = StageDag::build(&catalog).unwrap();

        assert_eq!(dag.topological_names().len(), 21);
        assert!(dag.edge_count() > 0);
    }

    #[test]
    fn test_input_from_later_stage_is_rejected() {
        let catalog = vec![
            merge_stage(1, "first", vec![StageInput::required(BETA)], ALPHA),
            merge_stage(2, "second", vec![], BETA),
        ];

        let result = StageDag::build(&catalog);
        assert!(matches!(result, Err(ReconflowError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_unproduced_input_is_rejected() {
        let catalog = vec![merge_stage(1, "first", vec![StageInput::required(BETA)], ALPHA)];

        let result = StageDag::build(&catalog);
        assert!(matches!(result, Err(ReconflowError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_non_contiguous_indices_are_rejected() {
        let catalog = vec![merge_stage(2, "first", vec![], ALPHA)];

        let result = StageDag::build(&catalog);
        assert!(matches!(result, Err(ReconflowError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_duplicate_output_keys_are_rejected() {
        let catalog = vec![
            merge_stage(1, "first", vec![], ALPHA),
            merge_stage(2, "second", vec![], ALPHA),
        ];

        let result = StageDag::build(&catalog);
        assert!(matches!(result, Err(ReconflowError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_mermaid_rendering() {
        let catalog = vec![
            merge_stage(1, "first", vec![], ALPHA),
            merge_stage(2, "second", vec![StageInput::required(ALPHA)], BETA),
        ];
        let dag = StageDag::build(&catalog).unwrap();

        insta::assert_snapshot!(dag.to_mermaid(&catalog), @r"
        graph TD
            first[first]
            second[second]
            first --> second
        ");
    }

    #[test]
    fn test_text_plan_lists_dependencies() {
        let catalog = build_catalog("example.com", &RunConfig::default());
        let dag = StageDag::build(&catalog).unwrap();
        let text = dag.to_text(&catalog);

        assert_eq!(text.lines().count(), 21);
        assert!(text.contains(" 1. subfinder (subfinder, fatal, 900s)"));
        assert!(text.contains("[depends: subfinder, amass-passive]"));
    }
}
