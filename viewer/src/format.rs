use meshview_core::mesh::{ComponentValue, FormatElement, Layout, ResourceFormat};

use crate::config::FormatterConfig;
use crate::decode::{Cell, Row};
use crate::index::DisplayIndex;

/// Rendered in place of any value that could not be read.
pub const MISSING: &str = "-";

/// Hex digits needed for the largest value one component of `format` can hold.
pub fn hex_digits(format: &ResourceFormat) -> usize {
    let bits = match format.special {
        Some(special) => special.max_component_bits(),
        None => format.comp_byte_width.clamp(1, 4) * 8,
    };
    bits.div_ceil(4) as usize
}

/// Stable, column-aligned rendering of decoded values.
///
/// Floats carry a leading space when their sign bit is clear, so positive
/// and negative values line up. Magnitudes outside the configured cutoffs
/// switch to exponential notation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberFormatter {
    min_figures: usize,
    max_figures: usize,
    exp_negative: f64,
    exp_positive: f64,
}

impl Default for NumberFormatter {
    fn default() -> Self {
        Self::new(&FormatterConfig::default())
    }
}

impl NumberFormatter {
    pub fn new(config: &FormatterConfig) -> Self {
        let max_figures = config.max_figures.max(2) as usize;
        Self {
            min_figures: (config.min_figures as usize).min(max_figures),
            max_figures,
            exp_negative: 10f64.powi(-(config.exp_negative_cutoff as i32)),
            exp_positive: 10f64.powi(config.exp_positive_cutoff as i32),
        }
    }

    pub fn format_float(&self, value: f64) -> String {
        if value.is_nan() {
            return " NaN".to_owned();
        }
        let body = if value.is_infinite() {
            if value > 0.0 { "inf".to_owned() } else { "-inf".to_owned() }
        } else if value != 0.0
            && (value.abs() < self.exp_negative || value.abs() > self.exp_positive)
        {
            self.exponential(value)
        } else {
            self.fixed(value)
        };
        if value.is_sign_negative() {
            body
        } else {
            format!(" {body}")
        }
    }

    fn fixed(&self, value: f64) -> String {
        let mut text = format!("{:.*}", self.max_figures, value);
        if let Some(dot) = text.rfind('.') {
            let keep = dot + 1 + self.min_figures;
            let trimmed = text.trim_end_matches('0').len().max(keep);
            text.truncate(trimmed);
        }
        text
    }

    fn exponential(&self, value: f64) -> String {
        let text = format!("{:.*E}", self.max_figures, value);
        match text.split_once('E') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{mantissa}E{sign}{digits:0>2}")
            }
            None => text,
        }
    }

    /// Decimal, or hex zero-padded to `digits`.
    pub fn format_uint(&self, value: u32, hex: bool, digits: usize) -> String {
        if hex {
            format!("{value:0digits$X}")
        } else {
            value.to_string()
        }
    }

    pub fn format_sint(&self, value: i32) -> String {
        value.to_string()
    }

    /// Formats one value as part of `element`.
    pub fn format_value(&self, value: &ComponentValue, element: &FormatElement) -> String {
        match *value {
            ComponentValue::Float(v) => self.format_float(v as f64),
            ComponentValue::Double(v) => self.format_float(v),
            ComponentValue::UInt(v) => {
                self.format_uint(v, element.hex, hex_digits(&element.format))
            }
            ComponentValue::SInt(v) => self.format_sint(v),
        }
    }

    pub fn format_cell(&self, cell: &Cell, element: &FormatElement) -> String {
        match cell {
            Cell::Missing => MISSING.to_owned(),
            Cell::Scalar(v) => self.format_value(v, element),
            Cell::Column(values) => values
                .iter()
                .map(|v| self.format_value(v, element))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn format_index(&self, index: DisplayIndex) -> String {
        match index {
            DisplayIndex::Vertex(i) => i.to_string(),
            DisplayIndex::Restart => "-1".to_owned(),
            DisplayIndex::Missing => MISSING.to_owned(),
        }
    }
}

/// Renders a row as display strings: row number, index, then one string per cell.
pub fn format_row(row: &Row, layout: &Layout, formatter: &NumberFormatter) -> Vec<String> {
    let mut out = Vec::with_capacity(row.cells.len() + 2);
    out.push(row.row().to_string());
    out.push(formatter.format_index(row.index.display));

    let owners = layout
        .elements
        .iter()
        .flat_map(|el| std::iter::repeat_n(el, el.column_count()));
    for (cell, element) in row.cells.iter().zip(owners) {
        out.push(formatter.format_cell(cell, element));
    }
    out
}
