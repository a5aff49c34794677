//! Coverage counters as they appear on JaCoCo `<counter>` elements.
//!
//! Counter parsing is deliberately permissive: a missing counter, or a
//! counter with absent or malformed `missed`/`covered` values, yields zeroes
//! instead of an error so partially written reports still aggregate.

use crate::model::CoverageInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterType {
    Instruction,
    Branch,
    Line,
}

impl CounterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterType::Instruction => "INSTRUCTION",
            CounterType::Branch => "BRANCH",
            CounterType::Line => "LINE",
        }
    }
}

impl std::fmt::Display for CounterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<counter type=".." missed=".." covered=".."/>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCounter {
    pub counter_type: String,
    pub missed: u64,
    pub covered: u64,
}

impl RawCounter {
    /// Build from raw attribute values; anything unparseable becomes zero.
    pub fn from_attrs(counter_type: &str, missed: Option<&str>, covered: Option<&str>) -> Self {
        Self {
            counter_type: counter_type.to_string(),
            missed: parse_count(missed),
            covered: parse_count(covered),
        }
    }
}

/// Parse a non-negative count, defaulting to zero.
pub fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Coverage for the first counter of type `ty`, or all zeroes if absent.
#[must_use]
pub fn parse_single_counter(counters: &[RawCounter], ty: CounterType) -> CoverageInfo {
    match counters.iter().find(|c| c.counter_type == ty.as_str()) {
        Some(counter) => CoverageInfo::from_missed(counter.covered, counter.missed),
        None => CoverageInfo::ZERO,
    }
}

/// The three counter kinds the report tracks for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub instruction: CoverageInfo,
    pub branch: CoverageInfo,
    pub line: CoverageInfo,
}

impl Counters {
    pub fn from_raw(counters: &[RawCounter]) -> Self {
        Self {
            instruction: parse_single_counter(counters, CounterType::Instruction),
            branch: parse_single_counter(counters, CounterType::Branch),
            line: parse_single_counter(counters, CounterType::Line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(ty: &str, missed: &str, covered: &str) -> RawCounter {
        RawCounter::from_attrs(ty, Some(missed), Some(covered))
    }

    #[test]
    fn test_parse_single_counter() {
        let counters = vec![
            counter("INSTRUCTION", "2", "8"),
            counter("BRANCH", "1", "3"),
        ];
        let info = parse_single_counter(&counters, CounterType::Instruction);
        assert_eq!(info, CoverageInfo { percent: 80, covered: 8, total: 10 });

        let info = parse_single_counter(&counters, CounterType::Branch);
        assert_eq!(info, CoverageInfo { percent: 75, covered: 3, total: 4 });
    }

    #[test]
    fn test_absent_type_defaults_to_zero() {
        let counters = vec![counter("INSTRUCTION", "2", "8")];
        assert_eq!(parse_single_counter(&counters, CounterType::Line), CoverageInfo::ZERO);
        assert_eq!(parse_single_counter(&[], CounterType::Branch), CoverageInfo::ZERO);
    }

    #[test]
    fn test_first_counter_of_a_type_wins() {
        let counters = vec![counter("LINE", "0", "4"), counter("LINE", "4", "0")];
        assert_eq!(parse_single_counter(&counters, CounterType::Line).percent, 100);
    }

    #[test]
    fn test_malformed_counts_default_to_zero() {
        let raw = RawCounter::from_attrs("INSTRUCTION", Some("abc"), None);
        assert_eq!(raw.missed, 0);
        assert_eq!(raw.covered, 0);
        assert_eq!(parse_single_counter(&[raw], CounterType::Instruction), CoverageInfo::ZERO);
    }

    #[test]
    fn test_percent_truncates() {
        for (covered, missed) in [(0u64, 0u64), (1, 2), (2, 1), (7, 0), (0, 9), (33, 67)] {
            let info = parse_single_counter(&[counter("BRANCH", &missed.to_string(), &covered.to_string())], CounterType::Branch);
            let expected = if covered + missed == 0 { 0 } else { (covered * 100 / (covered + missed)) as u32 };
            assert_eq!(info.percent, expected);
            assert_eq!(info.total, covered + missed);
        }
    }

    #[test]
    fn test_counters_from_raw() {
        let counters = Counters::from_raw(&[counter("LINE", "1", "1"), counter("METHOD", "0", "3")]);
        assert_eq!(counters.line.percent, 50);
        assert_eq!(counters.instruction, CoverageInfo::ZERO);
    }
}
