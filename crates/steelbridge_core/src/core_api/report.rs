use super::types::{ConversionReport, Outcome, Resolution, TraceEntry};

/// Accumulates resolution outcomes and warnings during translation.
/// Unresolved outcomes block the run only when strict mode asked for it.
#[derive(Debug)]
pub struct ReportBuilder {
    strict: bool,
    report: ConversionReport,
}

impl ReportBuilder {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            report: ConversionReport::default(),
        }
    }

    pub fn record(&mut self, resolution: &Resolution<'_>) {
        match resolution.outcome {
            Outcome::Matched => self.report.counts.matched += 1,
            Outcome::Approximated => self.report.counts.approximated += 1,
            Outcome::Placeholder => self.report.counts.placeholder += 1,
            Outcome::Unresolved => {
                self.report.counts.missing += 1;
                self.report.missing.push(resolution.query.clone());
                if self.strict {
                    self.report.has_blocking_issues = true;
                }
            }
        }
        self.report.trace.push(TraceEntry {
            query: resolution.query.clone(),
            expected: resolution.expected,
            outcome: resolution.outcome,
            confidence: resolution.confidence,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.report.warnings.push(message.into());
    }

    pub fn finalize(self) -> ConversionReport {
        self.report
    }
}
