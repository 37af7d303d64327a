//! NEAT configuration file
//!
//! The file uses an INI layout with the sections `[NEAT]` (population and
//! stopping criterion) and `[DefaultGenome]` (network shape and mutation
//! rates, mapped onto the library's [`NeatConfig`]). The raw document is
//! kept next to the typed view so the settings editor can change single
//! values and write the file back without losing its section order.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use symbios_neat::{Activation, NeatConfig};

use super::error::ConfigError;
use super::params::{self, SECTIONS};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

/// Order-preserving INI document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                doc.sections.push(IniSection {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            let syntax = || ConfigError::Syntax {
                line: index + 1,
                text: line.to_string(),
            };
            let (key, value) = line.split_once(['=', ':']).ok_or_else(syntax)?;
            let section = doc.sections.last_mut().ok_or_else(syntax)?;
            section
                .entries
                .push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
        Ok(doc)
    }

    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace a value, appending the key (and section) when absent
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let index = match self.sections.iter().position(|s| s.name == section) {
            Some(index) => index,
            None => {
                self.sections.push(IniSection {
                    name: section.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        let entries = &mut self.sections[index].entries;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                writeln!(f, "{key} = {value}")?;
            }
        }
        Ok(())
    }
}

/// Reduces a list of fitness values to one number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitnessFn {
    Max,
    Min,
    Mean,
}

impl FitnessFn {
    pub fn apply(self, values: &[f32]) -> f32 {
        if values.is_empty() {
            return f32::NEG_INFINITY;
        }
        match self {
            Self::Max => values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            Self::Min => values.iter().copied().fold(f32::INFINITY, f32::min),
            Self::Mean => values.iter().sum::<f32>() / values.len() as f32,
        }
    }
}

impl FromStr for FitnessFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            other => Err(format!("unknown fitness function `{other}`")),
        }
    }
}

/// How a new genome wires its inputs to its outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialConnection {
    Full,
    Unconnected,
}

impl FromStr for InitialConnection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "unconnected" => Ok(Self::Unconnected),
            other => Err(format!("unknown initial connection `{other}`")),
        }
    }
}

fn parse_activation(name: &str) -> Option<Activation> {
    match name {
        "sigmoid" => Some(Activation::Sigmoid),
        "tanh" => Some(Activation::Tanh),
        _ => None,
    }
}

/// The `[NEAT]` section
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionConfig {
    pub fitness_criterion: FitnessFn,
    pub fitness_threshold: f32,
    pub no_fitness_termination: bool,
    pub pop_size: usize,
    pub elitism: usize,
    pub mutation_rate: f32,
}

/// Validated configuration plus the document it came from
#[derive(Debug, Clone)]
pub struct Config {
    pub neat: EvolutionConfig,
    pub initial_connection: InitialConnection,
    pub genome: NeatConfig,
    document: IniDocument,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = text.parse()?;
        log::info!("Loaded NEAT config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.document.to_string()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn document(&self) -> &IniDocument {
        &self.document
    }

    /// Current value of a key, falling back to the documented default
    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.document
            .get(section, key)
            .or_else(|| params::find(section, key).and_then(|spec| spec.default))
    }

    /// Copy of this config with one value changed, validated again
    pub fn with_value(&self, section: &str, key: &str, value: &str) -> Result<Self, ConfigError> {
        let mut document = self.document.clone();
        document.set(section, key, value);
        Self::from_document(document)
    }

    pub fn from_document(document: IniDocument) -> Result<Self, ConfigError> {
        warn_unknown(&document);

        let n = Reader::new(&document, "NEAT")?;
        let neat = EvolutionConfig {
            fitness_criterion: n.parse("fitness_criterion", "max, min or mean")?,
            fitness_threshold: n.parse("fitness_threshold", "a number")?,
            no_fitness_termination: n.bool("no_fitness_termination")?,
            pop_size: n.parse("pop_size", "a positive integer")?,
            elitism: n.parse("elitism", "a non-negative integer")?,
            mutation_rate: n.non_negative("mutation_rate")?,
        };
        if neat.pop_size < 2 {
            return Err(invalid("NEAT", "pop_size", neat.pop_size, "at least 2"));
        }
        if neat.elitism >= neat.pop_size {
            return Err(invalid("NEAT", "elitism", neat.elitism, "less than pop_size"));
        }

        let g = Reader::new(&document, "DefaultGenome")?;
        let genome = NeatConfig {
            num_inputs: g.parse("num_inputs", "a positive integer")?,
            num_outputs: g.parse("num_outputs", "a positive integer")?,
            use_bias: g.bool("use_bias")?,
            output_activation: g.activation("output_activation")?,
            hidden_activations: g.hidden_activations("hidden_activations")?,
            add_connection_prob: g.non_negative("add_connection_prob")?,
            add_node_prob: g.non_negative("add_node_prob")?,
            weight_mutation_prob: g.non_negative("weight_mutation_prob")?,
            weight_mutation_power: g.non_negative("weight_mutation_power")?,
            weight_replace_prob: g.non_negative("weight_replace_prob")?,
            weight_range: g.non_negative("weight_range")?,
            toggle_enabled_prob: g.non_negative("toggle_enabled_prob")?,
            activation_mutation_prob: g.non_negative("activation_mutation_prob")?,
            ..NeatConfig::default()
        };
        if genome.num_inputs == 0 || genome.num_outputs == 0 {
            return Err(ConfigError::Unsupported(
                "a network needs at least one input and one output".to_string(),
            ));
        }

        Ok(Self {
            neat,
            initial_connection: g.parse("initial_connection", "full or unconnected")?,
            genome,
            document,
        })
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_document(IniDocument::parse(text)?)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.document, f)
    }
}

fn invalid(section: &str, key: &str, value: impl ToString, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

/// Keys left over from other NEAT tools are skipped, not fatal
fn warn_unknown(document: &IniDocument) {
    for section in document.sections() {
        if !SECTIONS.contains(&section.name.as_str()) {
            log::warn!("Ignoring unknown config section [{}]", section.name);
            continue;
        }
        for (key, _) in &section.entries {
            if params::find(&section.name, key).is_none() {
                log::warn!("Ignoring unknown config item [{}] {key}", section.name);
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Typed access to one section, falling back to catalog defaults
struct Reader<'a> {
    document: &'a IniDocument,
    section: &'static str,
}

impl<'a> Reader<'a> {
    fn new(document: &'a IniDocument, section: &'static str) -> Result<Self, ConfigError> {
        if document.section(section).is_none() {
            return Err(ConfigError::MissingSection(section.to_string()));
        }
        Ok(Self { document, section })
    }

    fn raw(&self, key: &str) -> Result<&'a str, ConfigError> {
        self.document
            .get(self.section, key)
            .or_else(|| params::find(self.section, key).and_then(|spec| spec.default))
            .ok_or_else(|| ConfigError::MissingKey {
                section: self.section.to_string(),
                key: key.to_string(),
            })
    }

    fn parse<T: FromStr>(&self, key: &str, expected: &str) -> Result<T, ConfigError> {
        let value = self.raw(key)?;
        value
            .parse()
            .map_err(|_| invalid(self.section, key, value, expected))
    }

    fn bool(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.raw(key)?;
        parse_bool(value).ok_or_else(|| invalid(self.section, key, value, "True or False"))
    }

    fn non_negative(&self, key: &str) -> Result<f32, ConfigError> {
        let value: f32 = self.parse(key, "a number")?;
        if value < 0.0 {
            return Err(invalid(self.section, key, value, "a non-negative number"));
        }
        Ok(value)
    }

    fn activation(&self, key: &str) -> Result<Activation, ConfigError> {
        let value = self.raw(key)?;
        parse_activation(value).ok_or_else(|| {
            invalid(self.section, key, value, &params::ACTIVATION_NAMES.join(" or "))
        })
    }

    /// Space separated activation names, or `cppn` for the library's CPPN set
    fn hidden_activations(&self, key: &str) -> Result<Vec<Activation>, ConfigError> {
        let value = self.raw(key)?;
        if value.trim() == "cppn" {
            return Ok(Activation::CPPN.to_vec());
        }
        let activations = value
            .split_whitespace()
            .map(|name| {
                parse_activation(name)
                    .ok_or_else(|| invalid(self.section, key, name, "sigmoid, tanh or cppn"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if activations.is_empty() {
            return Err(invalid(self.section, key, value, "at least one activation"));
        }
        Ok(activations)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Configuration used by the breakout trainer, small population
    pub(crate) const SAMPLE: &str = "\
# breakout paddle
[NEAT]
fitness_criterion     = max
fitness_threshold     = 2500
pop_size              = 20
elitism               = 2
mutation_rate         = 1.0

[DefaultGenome]
num_inputs            = 4
num_outputs           = 3
initial_connection    = full
use_bias              = True
output_activation     = tanh
hidden_activations    = sigmoid tanh
add_connection_prob   = 0.3
add_node_prob         = 0.1
weight_mutation_prob  = 0.8
weight_mutation_power = 0.5
";

    pub(crate) fn sample() -> Config {
        SAMPLE.parse().unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let config = sample();
        assert_eq!(config.neat.pop_size, 20);
        assert_eq!(config.neat.fitness_criterion, FitnessFn::Max);
        assert_eq!(config.neat.fitness_threshold, 2500.0);
        assert!(!config.neat.no_fitness_termination);
        assert_eq!(config.neat.elitism, 2);
        assert_eq!(config.initial_connection, InitialConnection::Full);
        assert_eq!(config.genome.num_inputs, 4);
        assert_eq!(config.genome.num_outputs, 3);
        assert!(config.genome.use_bias);
        assert!(matches!(config.genome.output_activation, Activation::Tanh));
        assert_eq!(config.genome.hidden_activations.len(), 2);
        assert_eq!(config.genome.add_connection_prob, 0.3);
        // omitted keys take the catalog default
        assert_eq!(config.genome.toggle_enabled_prob, 0.01);
    }

    #[test]
    fn test_display_round_trips() {
        let config = sample();
        let again: Config = config.to_string().parse().unwrap();
        assert_eq!(config.document(), again.document());
        assert_eq!(config.neat, again.neat);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let text = SAMPLE.replace(
            "pop_size              = 20",
            "pop_size = 20\nreset_on_extinction = False",
        ) + "\n[DefaultStagnation]\nmax_stagnation = 20\n";
        let config: Config = text.parse().unwrap();
        assert_eq!(config.neat.pop_size, 20);
        assert_eq!(config.value("NEAT", "reset_on_extinction"), Some("False"));
    }

    #[test]
    fn test_missing_required_key() {
        let text = SAMPLE.replace("pop_size              = 20\n", "");
        let err = text.parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { ref key, .. } if key == "pop_size"));
    }

    #[test]
    fn test_missing_section() {
        let start = SAMPLE.find("[DefaultGenome]").unwrap();
        let err = SAMPLE[..start].parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(ref s) if s == "DefaultGenome"));
    }

    #[test]
    fn test_malformed_values() {
        let text = SAMPLE.replace("use_bias              = True", "use_bias = maybe");
        assert!(matches!(text.parse::<Config>(), Err(ConfigError::InvalidValue { .. })));

        let text = SAMPLE.replace("output_activation     = tanh", "output_activation = relu");
        assert!(matches!(text.parse::<Config>(), Err(ConfigError::InvalidValue { .. })));

        let text = SAMPLE.replace("elitism               = 2", "elitism = 20");
        assert!(matches!(text.parse::<Config>(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_cppn_hidden_set() {
        let config = sample()
            .with_value("DefaultGenome", "hidden_activations", "cppn")
            .unwrap();
        assert_eq!(config.genome.hidden_activations.len(), Activation::CPPN.len());
    }

    #[test]
    fn test_entry_before_section_is_syntax_error() {
        let err = IniDocument::parse("pop_size = 3\n[NEAT]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_with_value_validates_and_keeps_order() {
        let config = sample();
        let changed = config.with_value("NEAT", "pop_size", "30").unwrap();
        assert_eq!(changed.neat.pop_size, 30);
        assert_eq!(changed.document().sections()[0].name, "NEAT");
        assert!(config.with_value("NEAT", "pop_size", "lots").is_err());
    }

    #[test]
    fn test_defaults_fill_omitted_keys() {
        let config = sample();
        assert_eq!(config.value("NEAT", "no_fitness_termination"), Some("False"));
        assert_eq!(config.value("DefaultGenome", "weight_range"), Some("1.0"));
    }

    #[test]
    fn test_fitness_fn() {
        let values = [1.0, 5.0, 3.0];
        assert_eq!(FitnessFn::Max.apply(&values), 5.0);
        assert_eq!(FitnessFn::Min.apply(&values), 1.0);
        assert_eq!(FitnessFn::Mean.apply(&values), 3.0);
        assert_eq!(FitnessFn::Max.apply(&[]), f32::NEG_INFINITY);
    }
}
