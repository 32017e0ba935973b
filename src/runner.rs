use std::fmt::{self, Display};

use instant::{Duration, Instant};

use crate::{egraph::EGraph, pattern::Rewrite, util::IndexMap};

/// Bounds on one saturation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerLimits {
    /// How many times every rule is applied at most.
    pub max_passes: usize,
    /// The run is aborted as soon as the egraph holds more classes than this.
    pub max_classes: Option<usize>,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        RunnerLimits {
            max_passes: 32,
            max_classes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A whole pass left the egraph unchanged.
    Saturated,
    PassLimit,
    ClassLimit { classes: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub passes: usize,
    pub stop_reason: StopReason,
    /// Changing applications, per rule name.
    pub applied_per_rule: IndexMap<String, usize>,
    pub rebuild_unions: usize,
    pub classes: usize,
    pub terms: usize,
    pub time: Duration,
}

impl RunReport {
    pub fn saturated(&self) -> bool {
        self.stop_reason == StopReason::Saturated
    }

    pub fn total_applied(&self) -> usize {
        self.applied_per_rule.values().sum()
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rule, applied) in &self.applied_per_rule {
            writeln!(f, "Rule {rule}: applied {applied}")?;
        }
        write!(
            f,
            "{} passes ({:?}), {} classes, {} terms, {} rebuild unions in {:.3}s",
            self.passes,
            self.stop_reason,
            self.classes,
            self.terms,
            self.rebuild_unions,
            self.time.as_secs_f64()
        )
    }
}

/// Applies a set of rules in rounds.
///
/// Each pass runs every rule once, in order, rebuilding after each one.
/// There is no true fixpoint detection beyond noticing a pass that
/// changed nothing, so a rule set that keeps growing the graph is only
/// stopped by the pass budget or the class limit.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    limits: RunnerLimits,
    rules: Vec<Rewrite>,
}

impl Runner {
    pub fn new(limits: RunnerLimits) -> Self {
        Runner {
            limits,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: Rewrite) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rewrite>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn rules(&self) -> &[Rewrite] {
        &self.rules
    }

    pub fn run(&self, egraph: &mut EGraph) -> RunReport {
        let start = Instant::now();
        let mut applied_per_rule: IndexMap<String, usize> = self
            .rules
            .iter()
            .map(|rule| (rule.name.clone(), 0))
            .collect();
        let mut rebuild_unions = egraph.rebuild();
        let mut passes = 0;

        let stop_reason = 'passes: loop {
            if passes >= self.limits.max_passes {
                break StopReason::PassLimit;
            }
            passes += 1;

            let mut changed = 0;
            for rule in &self.rules {
                let applied = egraph.rewrite(rule);
                let unions = egraph.rebuild();
                *applied_per_rule.entry(rule.name.clone()).or_default() += applied;
                rebuild_unions += unions;
                changed += applied + unions;

                if let Some(limit) = self.limits.max_classes {
                    let classes = egraph.num_classes();
                    if classes > limit {
                        log::debug!("Rule '{}' grew the egraph to {classes} classes", rule.name);
                        break 'passes StopReason::ClassLimit { classes, limit };
                    }
                }
            }

            log::trace!("Pass {passes}: {changed} changes");
            if changed == 0 {
                break StopReason::Saturated;
            }
        };

        let report = RunReport {
            passes,
            stop_reason,
            applied_per_rule,
            rebuild_unions,
            classes: egraph.num_classes(),
            terms: egraph.num_terms(),
            time: start.elapsed(),
        };
        log::debug!("Saturation stopped: {report}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_rewrite;

    #[test]
    fn commutativity_saturates() {
        let mut egraph = EGraph::default();
        let a = egraph.add_term("a");
        let b = egraph.add_term("b");
        let ab = egraph.add_operation("~>", [a, b]);

        let runner = Runner::default().with_rule(parse_rewrite("comm", "$x ~> $y => $y ~> $x").unwrap());
        let report = runner.run(&mut egraph);

        assert!(report.saturated());
        assert_eq!(report.passes, 2);
        assert_eq!(report.applied_per_rule["comm"], 1);
        assert_eq!(egraph.get_class(ab).len(), 2);
        assert!(egraph.is_clean());
    }

    #[test]
    fn pass_budget_is_respected() {
        let mut egraph = EGraph::default();
        let a = egraph.add_term("a");
        let b = egraph.add_term("b");
        egraph.add_operation("?", [a, b]);

        // keeps creating classes, see the warning on the property catalogue
        let grow = parse_rewrite("grow", "$x ? $y => ($y ? $x) ? $x").unwrap();
        let limits = RunnerLimits {
            max_passes: 3,
            max_classes: None,
        };
        let report = Runner::new(limits).with_rule(grow).run(&mut egraph);
        assert_eq!(report.stop_reason, StopReason::PassLimit);
        assert_eq!(report.passes, 3);
    }

    #[test]
    fn class_limit_aborts() {
        let mut egraph = EGraph::default();
        let a = egraph.add_term("a");
        let b = egraph.add_term("b");
        egraph.add_operation("?", [a, b]);

        let limits = RunnerLimits {
            max_passes: 100,
            max_classes: Some(10),
        };
        let report = Runner::new(limits)
            .with_rule(parse_rewrite("grow", "$x ? $y => ($y ? $x) ? $x").unwrap())
            .run(&mut egraph);

        match report.stop_reason {
            StopReason::ClassLimit { classes, limit } => {
                assert!(classes > limit);
                assert_eq!(limit, 10);
            }
            other => panic!("expected the class limit, got {other:?}"),
        }
    }
}
