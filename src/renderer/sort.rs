//! Sort keys for report tables: the name, or one coverage figure of one
//! variant (`instruction.debug.percent`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ReportError;
use crate::model::{coverage_for, CoverageInfo, VariantCoverage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageCounter {
    Instruction,
    Branch,
}

impl CoverageCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageCounter::Instruction => "instruction",
            CoverageCounter::Branch => "branch",
        }
    }

    fn pick<'a>(&self, coverage: &'a VariantCoverage) -> &'a CoverageInfo {
        match self {
            CoverageCounter::Instruction => &coverage.instruction,
            CoverageCounter::Branch => &coverage.branch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageField {
    Percent,
    Covered,
    Total,
}

impl CoverageField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageField::Percent => "percent",
            CoverageField::Covered => "covered",
            CoverageField::Total => "total",
        }
    }

    fn pick(&self, info: &CoverageInfo) -> u64 {
        match self {
            CoverageField::Percent => u64::from(info.percent),
            CoverageField::Covered => info.covered,
            CoverageField::Total => info.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Coverage {
        counter: CoverageCounter,
        variant: String,
        field: CoverageField,
    },
}

impl SortKey {
    pub fn coverage(counter: CoverageCounter, variant: impl Into<String>, field: CoverageField) -> Self {
        SortKey::Coverage {
            counter,
            variant: variant.into(),
            field,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Name => f.write_str("name"),
            SortKey::Coverage { counter, variant, field } => {
                write!(f, "{}.{}.{}", counter.as_str(), variant, field.as_str())
            }
        }
    }
}

impl FromStr for SortKey {
    type Err = ReportError;

    /// The variant is everything between the first and last segment, so
    /// variant names containing dots still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "name" {
            return Ok(SortKey::Name);
        }
        let invalid = || ReportError::Other(format!("invalid sort key: {s}"));
        let (counter, rest) = s.split_once('.').ok_or_else(invalid)?;
        let (variant, field) = rest.rsplit_once('.').ok_or_else(invalid)?;
        let counter = match counter {
            "instruction" => CoverageCounter::Instruction,
            "branch" => CoverageCounter::Branch,
            _ => return Err(invalid()),
        };
        let field = match field {
            "percent" => CoverageField::Percent,
            "covered" => CoverageField::Covered,
            "total" => CoverageField::Total,
            _ => return Err(invalid()),
        };
        if variant.is_empty() {
            return Err(invalid());
        }
        Ok(SortKey::coverage(counter, variant, field))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            SortOrder::Asc => "▲",
            SortOrder::Desc => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortState {
    /// Header click: the same key flips the order, a new key starts ascending.
    pub fn click(&mut self, key: SortKey) {
        if self.key == key {
            self.order = self.order.toggled();
        } else {
            self.key = key;
            self.order = SortOrder::Asc;
        }
    }

    /// Order two entities given their names and effective coverages.
    /// Entities without data for the sorted variant rank as zero.
    pub fn compare(
        &self,
        (name_a, coverages_a): (&str, &[VariantCoverage]),
        (name_b, coverages_b): (&str, &[VariantCoverage]),
    ) -> Ordering {
        let ordering = match &self.key {
            SortKey::Name => compare_names(name_a, name_b),
            SortKey::Coverage { counter, variant, field } => {
                let value = |coverages: &[VariantCoverage]| {
                    coverage_for(coverages, variant)
                        .map(|c| field.pick(counter.pick(c)))
                        .unwrap_or(0)
                };
                value(coverages_a).cmp(&value(coverages_b))
            }
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
