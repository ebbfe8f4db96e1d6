//! Pull the C/C++ source out of a model response.
//!
//! Strategies are tried in [`ExtractionStrategy::ORDER`]; the first one that
//! matches wins.

use once_cell::sync::Lazy;
use regex::Regex;

static TAGGED_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:c|cpp|cc)\n(.*?)```").unwrap());

static GENERIC_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```\n(.*?)```").unwrap());

/// Line prefixes that mark the start of unfenced code.
const CODE_PREFIXES: &[&str] = &["#include", "//", "/*", "void", "int"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// A fence tagged `c`, `cpp` or `cc`.
    TaggedFence,
    /// An untagged fence.
    GenericFence,
    /// Everything from the first line that looks like code.
    PrefixScan,
    /// The whole text.
    Passthrough,
}

impl ExtractionStrategy {
    pub const ORDER: [Self; 4] = [
        Self::TaggedFence,
        Self::GenericFence,
        Self::PrefixScan,
        Self::Passthrough,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TaggedFence => "tagged_fence",
            Self::GenericFence => "generic_fence",
            Self::PrefixScan => "prefix_scan",
            Self::Passthrough => "passthrough",
        }
    }

    /// Trimmed code if this strategy matches `raw`.
    #[must_use]
    pub fn apply(self, raw: &str) -> Option<String> {
        match self {
            Self::TaggedFence => fenced(&TAGGED_FENCE, raw),
            Self::GenericFence => fenced(&GENERIC_FENCE, raw),
            Self::PrefixScan => prefix_scan(raw),
            Self::Passthrough => Some(raw.trim().to_string()),
        }
    }
}

fn fenced(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn prefix_scan(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    let start = lines.iter().position(|line| {
        let trimmed = line.trim();
        CODE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
    })?;
    Some(lines[start..].join("\n").trim().to_string())
}

/// Extracted code and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub code: String,
    pub strategy: ExtractionStrategy,
}

#[must_use]
pub fn extract(raw: &str) -> Extraction {
    for strategy in ExtractionStrategy::ORDER {
        if let Some(code) = strategy.apply(raw) {
            return Extraction { code, strategy };
        }
    }
    // Passthrough always matches.
    Extraction {
        code: raw.trim().to_string(),
        strategy: ExtractionStrategy::Passthrough,
    }
}

/// Shorthand for `extract(raw).code`.
#[must_use]
pub fn extract_code(raw: &str) -> String {
    extract(raw).code
}
