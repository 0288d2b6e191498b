// query-log-rs/src/summary.rs
// Training report built from the outcome log aggregates.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use document_store::{value_text, Document};
use shared_types_rs::Outcome;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AverageTimings {
    pub total: f64,
    pub planner: f64,
    pub retrieval: f64,
    pub synthesis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeCount {
    /// Outcome as stored; unknown labels are kept verbatim.
    pub outcome: String,
    pub count: u64,
    pub percentage: f64,
    pub timings: AverageTimings,
}

impl OutcomeCount {
    pub fn description(&self) -> &'static str {
        Outcome::from_str(&self.outcome)
            .map(|o| o.description())
            .unwrap_or("No description.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub total_queries: u64,
    /// SUCCESS_DIRECT share of all queries, in percent.
    pub direct_success_rate: f64,
    pub averages: Option<AverageTimings>,
    /// Sorted by count, most frequent first.
    pub breakdown: Vec<OutcomeCount>,
}

fn number(doc: &Document, field: &str) -> f64 {
    doc.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn timings(doc: &Document) -> AverageTimings {
    AverageTimings {
        total: number(doc, "avg_total"),
        planner: number(doc, "avg_planner"),
        retrieval: number(doc, "avg_retrieval"),
        synthesis: number(doc, "avg_synth"),
    }
}

impl TrainingSummary {
    /// Build from `{_id: outcome, count, avg_*}` groups and the optional
    /// overall `{avg_*}` group.
    pub fn from_groups(by_outcome: &[Document], overall: Option<&Document>) -> Self {
        let total_queries: u64 = by_outcome
            .iter()
            .map(|g| g.get("count").and_then(Value::as_u64).unwrap_or(0))
            .sum();

        if total_queries == 0 {
            return Self::default();
        }

        let breakdown: Vec<OutcomeCount> = by_outcome
            .iter()
            .map(|group| {
                let count = group.get("count").and_then(Value::as_u64).unwrap_or(0);
                OutcomeCount {
                    outcome: group
                        .get("_id")
                        .and_then(value_text)
                        .unwrap_or_else(|| Outcome::FailUnknown.to_string()),
                    count,
                    percentage: count as f64 / total_queries as f64 * 100.0,
                    timings: timings(group),
                }
            })
            .collect();

        let direct = breakdown
            .iter()
            .filter(|c| c.outcome == Outcome::SuccessDirect.as_str())
            .map(|c| c.count)
            .sum::<u64>();

        Self {
            total_queries,
            direct_success_rate: direct as f64 / total_queries as f64 * 100.0,
            averages: overall.map(timings),
            breakdown,
        }
    }

    pub fn count_of(&self, outcome: Outcome) -> u64 {
        self.breakdown
            .iter()
            .filter(|c| c.outcome == outcome.as_str())
            .map(|c| c.count)
            .sum()
    }
}

impl fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_queries == 0 {
            return write!(f, "No training data recorded yet.");
        }

        writeln!(f, "Training Summary (from {} logged queries):", self.total_queries)?;
        writeln!(
            f,
            "  - Direct Success Rate (Primary tools worked): {:.1}%",
            self.direct_success_rate
        )?;
        writeln!(f)?;
        writeln!(f, "Average Performance (Overall):")?;
        match &self.averages {
            Some(t) => {
                writeln!(f, "  - Avg Total Time:   {:.2}s", t.total)?;
                writeln!(f, "  - Avg Planner:    {:.2}s", t.planner)?;
                writeln!(f, "  - Avg Retrieval:  {:.2}s", t.retrieval)?;
                writeln!(f, "  - Avg Synthesizer: {:.2}s", t.synthesis)?;
            }
            None => writeln!(f, "  No timing data available.")?,
        }
        writeln!(f)?;
        write!(f, "Detailed Outcome Breakdown:")?;
        for entry in &self.breakdown {
            write!(
                f,
                "\n   - {}: {} queries ({:.1}%) - {}",
                entry.outcome,
                entry.count,
                entry.percentage,
                entry.description()
            )?;
        }
        Ok(())
    }
}
