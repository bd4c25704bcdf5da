//! Post-processor settings
//!
//! Built-in defaults merged with the user's option string into one
//! immutable snapshot per export.

use std::iter::Peekable;
use std::ops::Range;

use thiserror::Error;
use uom::si::f64::{Length, Time, Velocity};
use uom::si::length::{inch, millimeter};
use uom::si::time::minute;
use uom::si::velocity::millimeter_per_second;

use crate::lexer::{self, options::OptionToken};

pub type Span = Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigParseError {
    #[error("unrecognized option `{option}`")]
    UnknownOption { option: String, span: Span },

    #[error("option `{option}` requires a value")]
    MissingValue { option: &'static str, span: Span },

    #[error("unexpected value `{value}`")]
    UnexpectedValue { value: String, span: Span },

    #[error("invalid precision `{value}`: expected a non-negative integer")]
    InvalidPrecision { value: String, span: Span },

    #[error("unreadable option text")]
    Lex { span: Span },
}

impl ConfigParseError {
    /// Byte range of the offending text in the option string
    pub fn span(&self) -> Span {
        match self {
            ConfigParseError::UnknownOption { span, .. }
            | ConfigParseError::MissingValue { span, .. }
            | ConfigParseError::UnexpectedValue { span, .. }
            | ConfigParseError::InvalidPrecision { span, .. }
            | ConfigParseError::Lex { span } => span.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric, // G21
    Imperial, // G20
}

impl UnitSystem {
    pub fn gcode(self) -> &'static str {
        match self {
            UnitSystem::Metric => "G21",
            UnitSystem::Imperial => "G20",
        }
    }

    fn measure(self, length: Length) -> f64 {
        match self {
            UnitSystem::Metric => length.get::<millimeter>(),
            UnitSystem::Imperial => length.get::<inch>(),
        }
    }

    /// Millimetres to the output length unit
    pub fn length(self, mm: f64) -> f64 {
        self.measure(Length::new::<millimeter>(mm))
    }

    /// Millimetres per second to output length per minute
    pub fn feed(self, mm_per_second: f64) -> f64 {
        let speed = Velocity::new::<millimeter_per_second>(mm_per_second);
        let per_minute: Length = speed * Time::new::<minute>(1.0);
        self.measure(per_minute)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_header: bool,
    pub output_comments: bool,
    pub line_numbers: bool,
    /// Offer the program to the review hook before it is finalized
    pub show_editor: bool,
    /// Digits after the decimal point
    pub precision: usize,
    pub units: UnitSystem,
    /// Drop a mnemonic equal to the previous line's
    pub modal: bool,
    /// Drop axis words whose value did not change
    pub axis_modal: bool,
    /// Follow tool changes with G43
    pub use_tlo: bool,
    pub preamble: String,
    pub postamble: String,
    pub pre_operation: String,
    pub post_operation: String,
    pub tool_change: String,
    pub machine_name: String,
    pub line_number_start: u32,
    pub line_number_step: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_header: true,
            output_comments: true,
            line_numbers: false,
            show_editor: true,
            precision: 3,
            units: UnitSystem::Metric,
            modal: true,
            axis_modal: true,
            use_tlo: true,
            preamble: "G17 G54 G40 G49 G80 G90\n".to_string(),
            postamble: "M05\nG53 G0 Z0.000\nG53 G0 X-350.000 Y0.000\nM30\n".to_string(),
            pre_operation: String::new(),
            post_operation: String::new(),
            tool_change: String::new(),
            machine_name: "HAASNGC".to_string(),
            line_number_start: 10,
            line_number_step: 5,
        }
    }
}

type Tokens = Peekable<std::vec::IntoIter<(OptionToken, Span)>>;

impl Settings {
    /// Apply an option string such as `--line-numbers --precision=4` to the defaults
    pub fn resolve(args: &str) -> Result<Settings, ConfigParseError> {
        Settings::default().with_options(args)
    }

    /// Apply an option string on top of these settings
    pub fn with_options(mut self, args: &str) -> Result<Settings, ConfigParseError> {
        let tokens = lexer::lex::<OptionToken>(args).map_err(|span| ConfigParseError::Lex { span })?;
        let mut tokens: Tokens = tokens.into_iter().peekable();
        let mut imperial = false;

        while let Some((token, span)) = tokens.next() {
            match token {
                OptionToken::NoHeader => self.output_header = false,
                OptionToken::NoComments => self.output_comments = false,
                OptionToken::LineNumbers => self.line_numbers = true,
                OptionToken::NoShowEditor => self.show_editor = false,
                OptionToken::Precision => {
                    let (value, value_span) = take_value(&mut tokens, "--precision", span)?;
                    self.precision = value
                        .parse::<usize>()
                        .map_err(|_| ConfigParseError::InvalidPrecision {
                            value,
                            span: value_span,
                        })?;
                }
                OptionToken::Preamble => {
                    let (value, _) = take_value(&mut tokens, "--preamble", span)?;
                    self.preamble = unescape(&value);
                }
                OptionToken::Postamble => {
                    let (value, _) = take_value(&mut tokens, "--postamble", span)?;
                    self.postamble = unescape(&value);
                }
                OptionToken::Inches => imperial = true,
                OptionToken::NoModal => self.modal = false,
                OptionToken::NoAxisModal => self.axis_modal = false,
                OptionToken::NoTlo => self.use_tlo = false,
                OptionToken::Unknown(option) => {
                    return Err(ConfigParseError::UnknownOption { option, span });
                }
                OptionToken::Equals => {
                    return Err(ConfigParseError::UnexpectedValue {
                        value: "=".to_string(),
                        span,
                    });
                }
                OptionToken::Word(value) | OptionToken::Quoted(value) => {
                    return Err(ConfigParseError::UnexpectedValue { value, span });
                }
            }
        }

        // Imperial output always runs at four places
        if imperial {
            self.units = UnitSystem::Imperial;
            self.precision = 4;
        }

        Ok(self)
    }

    /// Format a length given in millimetres
    pub fn format_length(&self, mm: f64) -> String {
        format!("{:.*}", self.precision, self.units.length(mm))
    }

    pub fn format_number(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }
}

/// Value of `--key=value` or `--key value`
fn take_value(
    tokens: &mut Tokens,
    option: &'static str,
    span: Span,
) -> Result<(String, Span), ConfigParseError> {
    if matches!(tokens.peek(), Some((OptionToken::Equals, _))) {
        tokens.next();
    }
    match tokens.next_if(|(t, _)| matches!(t, OptionToken::Word(_) | OptionToken::Quoted(_))) {
        Some((OptionToken::Word(value), value_span))
        | Some((OptionToken::Quoted(value), value_span)) => Ok((value, value_span)),
        _ => Err(ConfigParseError::MissingValue { option, span }),
    }
}

/// Text blocks typed on one line use `\n` for line breaks
fn unescape(value: &str) -> String {
    value.replace("\\n", "\n")
}
