use std::fmt;
use std::str::FromStr;

use crate::error::{SelectError, SelectResult};

/// One dimension of a parsed selection, not yet bound to a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimSpec {
    /// A single index; the dimension is dropped from the result shape.
    Point(u64),
    /// `start:stop:step`; omitted bounds default to `0` and the current extent.
    Slice {
        start: Option<u64>,
        stop: Option<u64>,
        step: u64,
    },
}

impl DimSpec {
    /// `:`, the whole dimension.
    pub const FULL: DimSpec = DimSpec::Slice {
        start: None,
        stop: None,
        step: 1,
    };
}

impl fmt::Display for DimSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(i) => write!(f, "{i}"),
            Self::Slice { start, stop, step } => {
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if *step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

/// A parsed selection expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSpec {
    pub dims: Vec<DimSpec>,
    /// A trailing `...` was given: remaining dimensions are selected whole.
    pub fill_rest: bool,
}

impl SelectionSpec {
    /// Select everything, whatever the rank.
    pub fn all() -> Self {
        Self {
            dims: Vec::new(),
            fill_rest: true,
        }
    }

    /// Parse a selection expression.
    ///
    /// Brackets are optional but must be balanced. The empty string and
    /// `ALL` select everything.
    pub fn parse(text: &str) -> SelectResult<Self> {
        let text = text.trim();
        if text.is_empty() || text == "ALL" {
            return Ok(Self::all());
        }

        let body = match (text.starts_with('['), text.ends_with(']')) {
            (true, true) => &text[1..text.len() - 1],
            (false, false) => text,
            (true, false) => {
                return Err(SelectError::InvalidSelection(
                    "selection is missing its closing bracket".into(),
                ))
            }
            (false, true) => {
                return Err(SelectError::InvalidSelection(
                    "selection is missing its opening bracket".into(),
                ))
            }
        };
        let body = body.trim();
        if body.is_empty() {
            return Ok(Self {
                dims: Vec::new(),
                fill_rest: false,
            });
        }

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let mut dims = Vec::with_capacity(parts.len());
        let mut fill_rest = false;
        for (dim, part) in parts.iter().enumerate() {
            if *part == "..." {
                if dim + 1 != parts.len() {
                    return Err(SelectError::InvalidSelection(
                        "'...' is only allowed as the last dimension".into(),
                    ));
                }
                fill_rest = true;
                continue;
            }
            dims.push(parse_dim(dim, part)?);
        }

        Ok(Self { dims, fill_rest })
    }
}

impl FromStr for SelectionSpec {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{dim}")?;
        }
        if self.fill_rest {
            if !self.dims.is_empty() {
                f.write_str(",")?;
            }
            f.write_str("...")?;
        }
        f.write_str("]")
    }
}

fn parse_dim(dim: usize, part: &str) -> SelectResult<DimSpec> {
    if part.is_empty() {
        return Err(SelectError::InvalidSelection(format!(
            "empty specification for dimension {dim}"
        )));
    }

    if !part.contains(':') {
        return Ok(DimSpec::Point(non_negative(dim, part)?));
    }

    let fields: Vec<&str> = part.split(':').map(str::trim).collect();
    if fields.len() > 3 {
        return Err(SelectError::InvalidSelection(format!(
            "too many ':' separators for dimension {dim}"
        )));
    }

    let bound = |s: &str| -> SelectResult<Option<u64>> {
        if s.is_empty() {
            Ok(None)
        } else {
            non_negative(dim, s).map(Some)
        }
    };
    let start = bound(fields[0])?;
    let stop = bound(fields[1])?;
    let step = match fields.get(2) {
        None | Some(&"") => 1,
        Some(s) => {
            let step = parse_int(dim, s)?;
            if step <= 0 {
                return Err(SelectError::InvalidStep { dim, step });
            }
            step as u64
        }
    };

    Ok(DimSpec::Slice { start, stop, step })
}

fn parse_int(dim: usize, s: &str) -> SelectResult<i64> {
    s.parse::<i64>().map_err(|_| {
        SelectError::InvalidSelection(format!(
            "cannot convert {s:?} to an integer for dimension {dim}"
        ))
    })
}

fn non_negative(dim: usize, s: &str) -> SelectResult<u64> {
    let n = parse_int(dim, s)?;
    if n < 0 {
        return Err(SelectError::OutOfBounds {
            dim,
            reason: format!("index {n} is negative"),
        });
    }
    Ok(n as u64)
}
