//! Catalog of every recognised configuration key
//!
//! The catalog drives validation (documented defaults fill in omitted keys,
//! keys it does not list are ignored) and the in-app settings editor.

/// Section names in file order
pub const SECTIONS: [&str; 2] = ["NEAT", "DefaultGenome"];

/// Activation names understood for output and hidden nodes
pub const ACTIVATION_NAMES: &[&str] = &["sigmoid", "tanh"];

const FITNESS_CRITERIA: &[&str] = &["max", "min", "mean"];
const INITIAL_CONNECTION: &[&str] = &["full", "unconnected"];
const HIDDEN_ACTIVATIONS: &[&str] = &["cppn", "sigmoid tanh", "tanh", "sigmoid"];

/// Value kind of a parameter, with the editing step where it applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Bool,
    Int { min: i64 },
    Float { step: f64 },
    /// Exactly one of the listed values
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub section: &'static str,
    pub name: &'static str,
    pub kind: ParamKind,
    /// `None` marks a required key
    pub default: Option<&'static str>,
    pub description: &'static str,
}

const fn p(
    section: &'static str,
    name: &'static str,
    kind: ParamKind,
    default: Option<&'static str>,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        section,
        name,
        kind,
        default,
        description,
    }
}

const G: &str = "DefaultGenome";
const FLOAT: ParamKind = ParamKind::Float { step: 0.1 };
const RATE: ParamKind = ParamKind::Float { step: 0.05 };

#[rustfmt::skip]
pub const CATALOG: &[ParamSpec] = &[
    p("NEAT", "fitness_criterion", ParamKind::Choice(FITNESS_CRITERIA), None,
        "How the population's fitness values are reduced before comparing with the threshold"),
    p("NEAT", "fitness_threshold", ParamKind::Float { step: 100.0 }, None,
        "Training stops once the reduced fitness reaches this value"),
    p("NEAT", "no_fitness_termination", ParamKind::Bool, Some("False"),
        "Ignore the threshold and run for the requested number of generations"),
    p("NEAT", "pop_size", ParamKind::Int { min: 2 }, None,
        "Number of genomes in each generation"),
    p("NEAT", "elitism", ParamKind::Int { min: 0 }, Some("2"),
        "Best genomes copied unchanged into the next generation"),
    p("NEAT", "mutation_rate", RATE, Some("1.0"),
        "Scale applied to every mutation probability when breeding"),

    p(G, "num_inputs", ParamKind::Int { min: 1 }, None, "Number of input nodes"),
    p(G, "num_outputs", ParamKind::Int { min: 1 }, None, "Number of output nodes"),
    p(G, "initial_connection", ParamKind::Choice(INITIAL_CONNECTION), Some("full"),
        "Whether new genomes start with every input wired to every output"),
    p(G, "use_bias", ParamKind::Bool, Some("True"), "Add a bias node feeding the outputs"),
    p(G, "output_activation", ParamKind::Choice(ACTIVATION_NAMES), Some("sigmoid"),
        "Activation function of the output nodes"),
    p(G, "hidden_activations", ParamKind::Choice(HIDDEN_ACTIVATIONS), Some("sigmoid tanh"),
        "Activations a new hidden node may pick from"),
    p(G, "add_connection_prob", RATE, Some("0.05"), "Chance of adding a connection per mutation"),
    p(G, "add_node_prob", RATE, Some("0.03"), "Chance of splitting a connection with a new node"),
    p(G, "weight_mutation_prob", RATE, Some("0.8"), "Chance of mutating each weight"),
    p(G, "weight_mutation_power", FLOAT, Some("0.5"), "Largest perturbation of a weight"),
    p(G, "weight_replace_prob", RATE, Some("0.1"),
        "Chance a mutated weight is replaced instead of perturbed"),
    p(G, "weight_range", FLOAT, Some("1.0"), "New weights are drawn from [-range, range]"),
    p(G, "toggle_enabled_prob", RATE, Some("0.01"), "Chance of toggling a connection"),
    p(G, "activation_mutation_prob", RATE, Some("0.1"),
        "Chance of switching a hidden node's activation"),
];

/// Look a key up in the catalog
pub fn find(section: &str, name: &str) -> Option<&'static ParamSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.section == section && spec.name == name)
}

/// Catalog entries of one section, in catalog order
pub fn section_params(section: &str) -> impl Iterator<Item = &'static ParamSpec> + '_ {
    CATALOG.iter().filter(move |spec| spec.section == section)
}

pub fn section_description(section: &str) -> &'static str {
    match section {
        "NEAT" => "Population size, breeding and the stopping criterion",
        "DefaultGenome" => "Network shape and mutation rates",
        _ => "",
    }
}

impl ParamSpec {
    /// Next value for the editor; `forward` moves up or right
    pub fn step(&self, current: &str, forward: bool) -> String {
        match self.kind {
            ParamKind::Bool => {
                if current.eq_ignore_ascii_case("true") {
                    "False".to_string()
                } else {
                    "True".to_string()
                }
            }
            ParamKind::Int { min } => {
                let value = current.trim().parse::<i64>().unwrap_or(min);
                let next = if forward { value + 1 } else { value - 1 };
                next.max(min).to_string()
            }
            ParamKind::Float { step } => {
                let value = current.trim().parse::<f64>().unwrap_or(0.0);
                let next = if forward { value + step } else { value - step };
                // keep the file readable
                let rounded = (next / step).round() * step + 0.0;
                format_float(rounded)
            }
            ParamKind::Choice(options) => cycle(options, current.trim(), forward).to_string(),
        }
    }
}

fn cycle<'a>(options: &'a [&'a str], current: &str, forward: bool) -> &'a str {
    let len = options.len();
    if len == 0 {
        return "";
    }
    let index = options.iter().position(|o| *o == current);
    let next = match (index, forward) {
        (None, _) => 0,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    };
    options[next]
}

fn format_float(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0');
    if text.ends_with('.') {
        format!("{text}0")
    } else {
        text.to_string()
    }
}
