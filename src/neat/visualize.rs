//! Graphviz export of genomes

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use symbios_genetics::Phenotype;
use symbios_neat::{NeatGenome, NodeId, NodeType};

use super::config::Config;
use super::population::Champion;
use super::reporting::Reporter;

#[derive(Debug, Clone, Copy)]
pub struct DotOptions {
    pub show_disabled: bool,
    /// Drop hidden nodes that cannot reach an output
    pub prune_unused: bool,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self {
            show_disabled: true,
            prune_unused: false,
        }
    }
}

/// Display names of the input and output pins, in pin order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinNames {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl PinNames {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Nodes with an enabled path to some output
fn reaching_outputs(genome: &NeatGenome) -> BTreeSet<NodeId> {
    let mut kept: BTreeSet<NodeId> = genome.output_ids.iter().copied().collect();
    loop {
        let before = kept.len();
        for conn in genome.connections.values() {
            if conn.enabled && kept.contains(&conn.output) {
                kept.insert(conn.input);
            }
        }
        if kept.len() == before {
            return kept;
        }
    }
}

fn label(genome: &NeatGenome, id: NodeId, names: &PinNames) -> String {
    let pin = |ids: &[NodeId], names: &[String]| {
        let index = ids.iter().position(|&i| i == id)?;
        Some(names.get(index).cloned().unwrap_or_else(|| index.to_string()))
    };
    let node = &genome.nodes[id];
    match node.node_type {
        NodeType::Input => pin(&genome.input_ids, &names.inputs),
        NodeType::Output => pin(&genome.output_ids, &names.outputs),
        NodeType::Bias => Some("bias".to_string()),
        NodeType::Hidden => None,
    }
    .unwrap_or_else(|| format!("{} {:?}", node.innovation, node.activation))
}

/// Render `genome` as a DOT digraph; inputs are boxes, outputs are blue.
/// Nodes are identified by their innovation number.
pub fn genome_to_dot(genome: &NeatGenome, names: &PinNames, options: DotOptions) -> String {
    let reaching = options.prune_unused.then(|| reaching_outputs(genome));
    let shown = |id: NodeId| {
        let hidden = matches!(genome.nodes[id].node_type, NodeType::Hidden);
        !hidden || reaching.as_ref().is_none_or(|r| r.contains(&id))
    };
    let node_name = |id: NodeId| quote(&genome.nodes[id].innovation.to_string());

    let mut dot = String::new();
    let _ = writeln!(dot, "digraph {} {{", quote("genome"));
    let _ = writeln!(dot, "    rankdir=LR;");
    let _ = writeln!(dot, "    node [fontsize=9, height=0.2, width=0.2];");

    let mut nodes: Vec<(NodeId, u64)> = genome
        .nodes
        .iter()
        .map(|(id, node)| (id, node.innovation))
        .collect();
    nodes.sort_by_key(|&(_, innovation)| innovation);
    for (id, _) in nodes.into_iter().filter(|&(id, _)| shown(id)) {
        let style = match genome.nodes[id].node_type {
            NodeType::Input | NodeType::Bias => "shape=box, style=filled, fillcolor=lightgray",
            NodeType::Output => "style=filled, fillcolor=lightblue",
            NodeType::Hidden => "style=filled, fillcolor=white",
        };
        let _ = writeln!(
            dot,
            "    {} [label={}, {style}];",
            node_name(id),
            quote(&label(genome, id, names))
        );
    }

    let mut connections: Vec<_> = genome.connections.values().collect();
    connections.sort_by_key(|c| c.innovation);
    for conn in connections {
        if !conn.enabled && !options.show_disabled {
            continue;
        }
        if !genome.nodes.contains_key(conn.input) || !genome.nodes.contains_key(conn.output) {
            continue;
        }
        if !shown(conn.input) || !shown(conn.output) {
            continue;
        }
        let style = if conn.enabled { "solid" } else { "dotted" };
        let color = if conn.weight > 0.0 { "green" } else { "red" };
        let width = 0.1 + (conn.weight / 5.0).abs();
        let _ = writeln!(
            dot,
            "    {} -> {} [style={style}, color={color}, penwidth={width:.3}];",
            node_name(conn.input),
            node_name(conn.output)
        );
    }
    dot.push_str("}\n");
    dot
}

/// Writes the best genome of every generation as `winner_<generation>.dot`
pub struct SchemeReporter {
    dir: PathBuf,
    names: PinNames,
}

impl SchemeReporter {
    pub fn new(dir: PathBuf, names: PinNames) -> Self {
        Self { dir, names }
    }

    pub fn path_for(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("winner_{generation}.dot"))
    }
}

impl Reporter for SchemeReporter {
    fn post_evaluate(
        &mut self,
        _config: &Config,
        generation: usize,
        _members: &[Phenotype<NeatGenome>],
        best: &Champion,
    ) {
        let dot = genome_to_dot(&best.genome, &self.names, DotOptions::default());
        let path = self.path_for(generation);
        let written = fs::create_dir_all(&self.dir).and_then(|()| fs::write(&path, dot));
        match written {
            Ok(()) => log::debug!("Wrote network scheme {}", path.display()),
            Err(e) => log::warn!("Failed to write network scheme {}: {e}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::config::tests::sample;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn names() -> PinNames {
        PinNames::new(&["ball x"], &["left"])
    }

    #[test]
    fn test_dot_lists_named_nodes_and_edges() {
        let config = sample();
        let mut rng = Pcg32::seed_from_u64(1);
        let genome = NeatGenome::fully_connected(config.genome.clone(), &mut rng);

        let dot = genome_to_dot(&genome, &names(), DotOptions::default());
        assert!(dot.starts_with("digraph \"genome\" {"));
        // bias is innovation 0, inputs follow
        assert!(dot.contains("\"0\" [label=\"bias\", shape=box"));
        assert!(dot.contains("\"1\" [label=\"ball x\", shape=box"));
        assert!(dot.contains("\"2\" [label=\"1\", shape=box"));
        assert!(dot.contains("\"5\" [label=\"left\", style=filled, fillcolor=lightblue]"));
        // 4 x 3 input links plus 3 bias links
        assert_eq!(dot.matches(" -> ").count(), 15);
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_disabled_edges_hidden_on_request() {
        let config = sample();
        let mut rng = Pcg32::seed_from_u64(2);
        let mut genome = NeatGenome::fully_connected(config.genome.clone(), &mut rng);
        if let Some(conn) = genome.connections.values_mut().next() {
            conn.enabled = false;
        }
        let options = DotOptions {
            show_disabled: false,
            prune_unused: true,
        };
        let dot = genome_to_dot(&genome, &PinNames::default(), options);
        assert_eq!(dot.matches(" -> ").count(), 14);
        assert!(!dot.contains("dotted"));
        assert_eq!(
            genome_to_dot(&genome, &PinNames::default(), DotOptions::default())
                .matches("dotted")
                .count(),
            1
        );
    }

    #[test]
    fn test_hidden_node_without_path_is_pruned() {
        let config = sample();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut genome = NeatGenome::fully_connected(config.genome.clone(), &mut rng);
        let Some(conn) = genome.connections.keys().next() else {
            panic!("fully connected genome has connections");
        };
        let hidden = genome.add_node(conn, &mut rng).unwrap();
        let label = format!("{:?}", genome.nodes[hidden].activation);
        for conn in genome.connections.values_mut() {
            if conn.input == hidden {
                conn.enabled = false;
            }
        }

        let full = genome_to_dot(&genome, &PinNames::default(), DotOptions::default());
        assert!(full.contains(&label));
        let options = DotOptions {
            show_disabled: true,
            prune_unused: true,
        };
        let pruned = genome_to_dot(&genome, &PinNames::default(), options);
        assert!(!pruned.contains(&label));
    }

    #[test]
    fn test_scheme_reporter_writes_file() {
        let config = sample();
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = SchemeReporter::new(dir.path().join("neuro_schemes"), names());
        let best = Champion {
            generation: 7,
            key: 3,
            fitness: 1.0,
            genome: NeatGenome::minimal(config.genome.clone()),
        };
        reporter.post_evaluate(&config, 7, &[], &best);
        let written = fs::read_to_string(reporter.path_for(7)).unwrap();
        assert!(written.contains("ball x"));
    }
}
