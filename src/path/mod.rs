//! Tool-path tree handed over by the host CAM application
//! Placement is already resolved: every command is in machine coordinates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexer::{self, Token};
use crate::tool::ToolDescriptor;

/// Parameter letters understood by the post, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    X,
    Y,
    Z,
    A,
    B,
    C,
    I,
    J,
    F,
    S,
    T,
    Q,
    R,
    L,
    H,
    D,
    P,
}

impl Param {
    pub const ALL: [Param; 17] = [
        Param::X,
        Param::Y,
        Param::Z,
        Param::A,
        Param::B,
        Param::C,
        Param::I,
        Param::J,
        Param::F,
        Param::S,
        Param::T,
        Param::Q,
        Param::R,
        Param::L,
        Param::H,
        Param::D,
        Param::P,
    ];

    pub fn letter(self) -> char {
        match self {
            Param::X => 'X',
            Param::Y => 'Y',
            Param::Z => 'Z',
            Param::A => 'A',
            Param::B => 'B',
            Param::C => 'C',
            Param::I => 'I',
            Param::J => 'J',
            Param::F => 'F',
            Param::S => 'S',
            Param::T => 'T',
            Param::Q => 'Q',
            Param::R => 'R',
            Param::L => 'L',
            Param::H => 'H',
            Param::D => 'D',
            Param::P => 'P',
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,

    #[error("unreadable input at {0:?}")]
    Invalid(std::ops::Range<usize>),

    #[error("command must start with a mnemonic, got {0:?}")]
    MissingMnemonic(String),

    #[error("parameter {0} given twice")]
    DuplicateParameter(char),
}

/// One record of the tool-path
///
/// Lengths are millimetres, feed rates millimetres per second and spindle
/// speeds rpm. Letters outside [`Param::ALL`] may be present; the post
/// ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CommandRepr")]
pub struct Command {
    pub name: String,
    pub parameters: BTreeMap<char, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: BTreeMap::new(),
            text: None,
        }
    }

    /// A `message` pseudo-command carrying free text
    pub fn message(text: &str) -> Self {
        Self {
            name: "message".to_string(),
            parameters: BTreeMap::new(),
            text: Some(text.to_string()),
        }
    }

    pub fn with(mut self, param: Param, value: f64) -> Self {
        self.parameters.insert(param.letter(), value);
        self
    }

    pub fn get(&self, param: Param) -> Option<f64> {
        self.parameters.get(&param.letter()).copied()
    }

    /// Known parameters in emission order
    pub fn params(&self) -> impl Iterator<Item = (Param, f64)> + '_ {
        Param::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|v| (p, v)))
    }

    pub fn is_comment(&self) -> bool {
        self.name.starts_with('(')
    }

    /// Build a command from a G-code block such as `G1 X10 Y20 F100`
    pub fn parse(input: &str) -> Result<Self, CommandParseError> {
        let tokens = lexer::lex::<Token>(input).map_err(CommandParseError::Invalid)?;
        let mut tokens = tokens.into_iter().map(|(t, _)| t);

        let mut command = match tokens.next() {
            None => return Err(CommandParseError::Empty),
            Some(Token::Word(w)) => Command::new(&format!("{}{}", w.letter, w.raw)),
            Some(Token::Comment(c)) => Command::new(&c),
            Some(Token::Ident(name)) => Command::new(&name),
        };

        for token in tokens {
            match token {
                Token::Word(w) => {
                    if command.parameters.insert(w.letter, w.value).is_some() {
                        return Err(CommandParseError::DuplicateParameter(w.letter));
                    }
                }
                Token::Comment(c) => {
                    command.text = Some(c[1..c.len() - 1].trim().to_string());
                }
                Token::Ident(name) => return Err(CommandParseError::MissingMnemonic(name)),
            }
        }

        Ok(command)
    }
}

impl std::str::FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

/// Commands in job files may be written as G-code text or as objects
#[derive(Deserialize)]
#[serde(untagged)]
enum CommandRepr {
    Text(String),
    Fields {
        name: String,
        #[serde(default)]
        parameters: BTreeMap<char, f64>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl TryFrom<CommandRepr> for Command {
    type Error = CommandParseError;

    fn try_from(repr: CommandRepr) -> Result<Self, Self::Error> {
        match repr {
            CommandRepr::Text(text) => Command::parse(&text),
            CommandRepr::Fields {
                name,
                parameters,
                text,
            } => Ok(Command {
                name,
                parameters: parameters
                    .into_iter()
                    .map(|(k, v)| (k.to_ascii_uppercase(), v))
                    .collect(),
                text,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoolantMode {
    #[default]
    None,
    Flood,
    Mist,
}

impl fmt::Display for CoolantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoolantMode::None => write!(f, "None"),
            CoolantMode::Flood => write!(f, "Flood"),
            CoolantMode::Mist => write!(f, "Mist"),
        }
    }
}

/// The object an operation is derived from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseRef {
    pub active: Option<bool>,
    pub coolant_mode: Option<CoolantMode>,
}

/// A leaf of the tree: one machining operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub name: String,
    pub label: String,
    pub active: bool,
    pub base: Option<BaseRef>,
    pub coolant_mode: Option<CoolantMode>,
    pub tool: Option<ToolDescriptor>,
    pub spindle_speed: Option<f64>,
    pub cycle_time: Option<String>,
    pub commands: Vec<Command>,
}

impl Default for Operation {
    fn default() -> Self {
        Self {
            name: String::new(),
            label: String::new(),
            active: true,
            base: None,
            coolant_mode: None,
            tool: None,
            spindle_speed: None,
            cycle_time: None,
            commands: Vec::new(),
        }
    }
}

impl Operation {
    pub fn new(label: &str, commands: Vec<Command>) -> Self {
        Self {
            name: label.to_string(),
            label: label.to_string(),
            commands,
            ..Self::default()
        }
    }

    /// Inactive when either the operation or its base is switched off
    pub fn is_active(&self) -> bool {
        self.active && self.base.as_ref().and_then(|b| b.active).unwrap_or(true)
    }

    /// Own coolant mode, else the base's, else none
    pub fn coolant(&self) -> CoolantMode {
        self.coolant_mode
            .or_else(|| self.base.as_ref().and_then(|b| b.coolant_mode))
            .unwrap_or_default()
    }

    pub fn has_tap(&self) -> bool {
        self.tool.as_ref().is_some_and(ToolDescriptor::is_tap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathNode {
    /// Compound or project: children in order, no markup of its own
    Group {
        #[serde(default)]
        label: String,
        children: Vec<PathNode>,
    },
    Operation(Operation),
    /// Anything without a path (stock, models)
    Other { name: String },
}

impl PathNode {
    pub fn name(&self) -> &str {
        match self {
            PathNode::Group { label, .. } => label,
            PathNode::Operation(op) => &op.name,
            PathNode::Other { name } => name,
        }
    }

    pub fn is_path(&self) -> bool {
        !matches!(self, PathNode::Other { .. })
    }
}

impl From<Operation> for PathNode {
    fn from(op: Operation) -> Self {
        PathNode::Operation(op)
    }
}
