use std::cmp::Reverse;
use std::fmt::{self, Display};
use std::rc::Rc;

use instant::{Duration, Instant};
use thiserror::Error;

use crate::{
    egraph::EGraph,
    extract::{Extractor, Hint, HintsByClass, DEFAULT_SAMPLES_PER_TERM},
    parse::{parse_expr, ParseError},
    pattern::{Pattern, Rewrite, Subst},
    properties::{Property, PARTNER_PLACEHOLDER, PROPERTIES},
    random::Random,
    runner::{RunReport, Runner, RunnerLimits, StopReason},
    seed::Seed,
    unionfind::Id,
    util::{IndexMap, IndexSet, Symbol},
};

pub const ASCII_TERMS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

/// Operations in one group look alike, so a quest uses at most one of
/// them.
pub const ASCII_OPERATION_GROUPS: &[&[&str]] = &[
    &[":>", "|>"],
    &["-<", ">-"],
    &["=<<", "-<<"],
    &["|-", "-|"],
    &["~>"],
    &["?"],
    &["!"],
    &["~"],
    &["::"],
    &["@"],
    &["#"],
    &["$"],
    &["&"],
    &["."],
];

/// Terms that are hard to confuse with the arrows below.
pub const WEB_TERMS: &[&str] = &[
    "a", "d", "e", "f", "n", "o", "q", "s", "u", "v", "w", "x", "y", "z", "0", "1", "3", "4", "5",
    "7", "9",
];

pub const WEB_OPERATION_GROUPS: &[&[&str]] = &[
    &["⇌", "⥢", "⥤"],
    &["⥃", "⥄"],
    &["⤝", "⤞"],
    &["↫", "↬"],
    &["⬸", "⤑"],
    &["⤙", "⤚", "⤜"],
    &["⥊", "⥐", "↽", "⇀"],
    &["⤾", "⤿", "⤸", "⤹", "⤻"],
    &["∷", "∴", "∵"],
    &["⠔", "⠢"],
    &["∺", "∻"],
    &["≀"],
];

/// The pair of every level that the question is built from.
const QUESTION_PAIR: usize = 1;
const PAIRS_PER_LEVEL: usize = 4;

#[derive(Debug, Clone)]
pub struct QuestConfig {
    pub num_levels: usize,
    /// Attempts with a fresh egraph before giving up.
    pub max_attempts: usize,
    pub saturation_passes: usize,
    pub samples_per_term: usize,
    /// Generation is aborted once the egraph has more classes than this
    /// many times the number of terms and operation groups in use.
    pub growth_factor: usize,
    pub terms: IndexSet<Symbol>,
    pub operation_groups: Vec<Vec<Symbol>>,
    pub properties: Vec<Property>,
}

impl Default for QuestConfig {
    fn default() -> Self {
        QuestConfig {
            num_levels: 4,
            max_attempts: 1000,
            saturation_passes: 32,
            samples_per_term: DEFAULT_SAMPLES_PER_TERM,
            growth_factor: 5,
            terms: ASCII_TERMS.iter().map(|&t| Symbol::from(t)).collect(),
            operation_groups: groups(ASCII_OPERATION_GROUPS),
            properties: PROPERTIES.to_vec(),
        }
    }
}

impl QuestConfig {
    /// Unicode operations and a term alphabet that reads well next to them.
    pub fn web() -> Self {
        QuestConfig {
            terms: WEB_TERMS.iter().map(|&t| Symbol::from(t)).collect(),
            operation_groups: groups(WEB_OPERATION_GROUPS),
            ..Default::default()
        }
    }
}

fn groups(groups: &[&[&str]]) -> Vec<Vec<Symbol>> {
    groups
        .iter()
        .map(|group| group.iter().map(|&op| Symbol::from(op)).collect())
        .collect()
}

/// Why one generation attempt was thrown away.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("level {level}: no hint has at most one new operation")]
    NoAdmissibleHints { level: usize },
    #[error("level {level}: no question introduces exactly one new operation")]
    NoQuestion { level: usize },
    #[error("level {level}: the question has no answers")]
    NoAnswers { level: usize },
    #[error("level {level}: no two different equal hints to show")]
    NoHintPair { level: usize },
    #[error("level {level}: neither side of the hint uses the new operation")]
    HintMissesOperation { level: usize },
    #[error("the egraph grew to {classes} classes, more than the limit of {limit}")]
    ClassExplosion { classes: usize, limit: usize },
    #[error("ran out of terms")]
    OutOfTerms,
    #[error("ran out of operations")]
    OutOfOperations,
    #[error("level {level}: no property left to pick")]
    NoProperty { level: usize },
    #[error(transparent)]
    Template(#[from] ParseError),
}

/// One step of a quest.
#[derive(Debug, Clone)]
pub struct Level {
    pub index: usize,
    /// Shown to the player as `hint_lhs = hint_rhs`.
    pub hint_lhs: Rc<Hint>,
    pub hint_rhs: Rc<Hint>,
    pub question: Rc<Hint>,
    /// The operation this level introduces.
    pub operation: Symbol,
    pub answers: IndexSet<String>,
    pub decoys: IndexSet<String>,
    pub suggestions: Vec<String>,
    /// Every hint with at most one operation the player has not seen.
    pub hints: Vec<Rc<Hint>>,
    pub answer_terms: IndexSet<Symbol>,
    pub answer_operations: IndexSet<Symbol>,
    /// Terms and operations seen up to and including this level.
    pub known_terms: IndexSet<Symbol>,
    pub known_operations: IndexSet<Symbol>,
}

impl Level {
    pub fn formatted_hint(&self) -> String {
        format!("{} = {}", self.hint_lhs.formatted, self.hint_rhs.formatted)
    }

    /// The class every valid answer belongs to.
    pub fn question_class(&self) -> Id {
        self.question.root_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub seed: Seed,
    pub attempts: usize,
    pub classes: usize,
    pub terms: usize,
    pub passes: usize,
    pub elapsed: Duration,
}

impl Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Seed {}: {} attempts, {} classes, {} terms, {} passes, {} ms",
            self.seed,
            self.attempts,
            self.classes,
            self.terms,
            self.passes,
            self.elapsed.as_millis()
        )
    }
}

/// A generated quest. The egraph is kept to validate answers against.
#[derive(Debug, Clone)]
pub struct Quest {
    pub levels: Vec<Level>,
    pub egraph: EGraph,
    pub report: GenerationReport,
}

#[derive(Debug, Clone, Default)]
pub struct QuestGenerator {
    config: QuestConfig,
}

impl QuestGenerator {
    pub fn new(config: QuestConfig) -> Self {
        QuestGenerator { config }
    }

    pub fn config(&self) -> &QuestConfig {
        &self.config
    }

    /// Generates a quest, retrying with a fresh egraph until an attempt
    /// succeeds or the attempt budget runs out.
    pub fn generate(&self, seed: Seed) -> Result<Quest, crate::Error> {
        seed.check_version()?;
        let start = Instant::now();
        let mut random = Random::new(u64::from(seed.value));

        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut egraph = EGraph::default();
            match self.try_generate(&mut egraph, &mut random) {
                Ok((levels, run)) => {
                    let report = GenerationReport {
                        seed,
                        attempts,
                        classes: egraph.num_classes(),
                        terms: egraph.num_terms(),
                        passes: run.passes,
                        elapsed: start.elapsed(),
                    };
                    log::info!("Generated {} levels. {report}", levels.len());
                    return Ok(Quest {
                        levels,
                        egraph,
                        report,
                    });
                }
                Err(last) if attempts >= self.config.max_attempts => {
                    return Err(crate::Error::RetriesExhausted { attempts, last });
                }
                Err(err) => log::debug!("Attempt {attempts} failed: {err}"),
            }
        }
    }

    /// One attempt: build, saturate, extract and assemble every level.
    pub fn try_generate(
        &self,
        egraph: &mut EGraph,
        random: &mut Random,
    ) -> Result<(Vec<Level>, RunReport), GenerationError> {
        let blueprint = Builder::new(&self.config, egraph, random).build()?;

        let limit = blueprint.symbols_in_use * self.config.growth_factor;
        let limits = RunnerLimits {
            max_passes: self.config.saturation_passes,
            max_classes: Some(limit),
        };
        let run = Runner::new(limits)
            .with_rules(blueprint.rules)
            .run(egraph);
        if let StopReason::ClassLimit { classes, limit } = run.stop_reason {
            return Err(GenerationError::ClassExplosion { classes, limit });
        }

        let quest_classes: Vec<IndexSet<Id>> = blueprint
            .quest_terms
            .iter()
            .map(|ids| ids.iter().map(|&id| egraph.find(id)).collect())
            .collect();

        let hints = Extractor::new(egraph, random)
            .with_samples_per_term(self.config.samples_per_term)
            .extract();

        let mut shown = IndexSet::default();
        let mut levels: Vec<Level> = Vec::with_capacity(quest_classes.len());
        for (index, classes) in quest_classes.iter().enumerate() {
            let level = LevelAssembler {
                index,
                is_last: index + 1 == quest_classes.len(),
                egraph: &*egraph,
                random: &mut *random,
            }
            .assemble(&hints, classes, &mut shown, levels.last())?;
            levels.push(level);
        }
        Ok((levels, run))
    }
}

/// What the build phase leaves for saturation.
struct Blueprint {
    rules: Vec<Rewrite>,
    /// The question pair roots of every level.
    quest_terms: Vec<[Id; 2]>,
    /// Terms plus operation groups in use.
    symbols_in_use: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermSource {
    Fresh,
    /// A recycled term if there is one.
    Recycled,
    /// A recycled term half of the time.
    MaybeRecycled,
}

/// Picks a property and an operation per level and seeds the egraph with
/// four instances of each level's left-hand side.
struct Builder<'a> {
    config: &'a QuestConfig,
    egraph: &'a mut EGraph,
    random: &'a mut Random,
    used_terms: IndexSet<Symbol>,
    recycled: IndexSet<Id>,
    used_recycled: IndexSet<Id>,
}

impl<'a> Builder<'a> {
    fn new(config: &'a QuestConfig, egraph: &'a mut EGraph, random: &'a mut Random) -> Self {
        Builder {
            config,
            egraph,
            random,
            used_terms: IndexSet::default(),
            recycled: IndexSet::default(),
            used_recycled: IndexSet::default(),
        }
    }

    fn build(mut self) -> Result<Blueprint, GenerationError> {
        let properties = self.pick_properties()?;

        let all_groups: IndexSet<usize> = (0..self.config.operation_groups.len()).collect();
        let mut used_groups = IndexSet::default();
        let mut operations: Vec<Symbol> = Vec::new();
        let mut rules = Vec::new();
        let mut quest_terms = Vec::new();
        let mut recycle_next_step: Vec<Id> = Vec::new();

        for (level, property) in properties.into_iter().enumerate() {
            let group = self
                .random
                .pick_one_unique(&all_groups, &mut used_groups)
                .ok_or(GenerationError::OutOfOperations)?;
            let operation = *self
                .random
                .pick_one(&self.config.operation_groups[group])
                .ok_or(GenerationError::OutOfOperations)?;

            let mut renames = IndexMap::default();
            if property.needs_partner() {
                let partner = *self
                    .random
                    .pick_one(&operations)
                    .ok_or(GenerationError::NoProperty { level })?;
                renames.insert(Symbol::from(PARTNER_PLACEHOLDER), partner);
            }
            for constant in property.constants()? {
                let term = self.fresh_symbol()?;
                renames.insert(constant, term);
            }
            let rule = property.instantiate(operation, &renames)?;
            log::debug!("Level {level}: {rule}");

            let mut roots = [Id::from(0); PAIRS_PER_LEVEL];
            let mut lefts = [Id::from(0); PAIRS_PER_LEVEL];
            for pair in 0..PAIRS_PER_LEVEL {
                let subst = self.bind_vars(&rule.lhs, pair)?;
                roots[pair] = rule.lhs.instantiate(self.egraph, &subst);
                lefts[pair] = rule.lhs.children()[0].instantiate(self.egraph, &subst);
            }

            // pairs 3 and 4 show up again later, under other operations
            self.recycled.extend([roots[2], lefts[2], roots[3]]);
            self.recycled.extend(recycle_next_step);
            recycle_next_step = vec![roots[0], lefts[3], roots[1]];

            quest_terms.push([roots[0], roots[QUESTION_PAIR]]);
            operations.push(operation);
            rules.push(rule);
        }

        Ok(Blueprint {
            rules,
            quest_terms,
            symbols_in_use: self.used_terms.len() + used_groups.len(),
        })
    }

    fn pick_properties(&mut self) -> Result<Vec<Property>, GenerationError> {
        let mut used = IndexSet::default();
        (0..self.config.num_levels)
            .map(|level| {
                let eligible: IndexSet<usize> = self
                    .config
                    .properties
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.is_eligible(level) && (level > 0 || !p.needs_partner()))
                    .map(|(i, _)| i)
                    .collect();
                let index = self
                    .random
                    .pick_one_unique(&eligible, &mut used)
                    .ok_or(GenerationError::NoProperty { level })?;
                Ok(self.config.properties[index])
            })
            .collect()
    }

    fn bind_vars(&mut self, lhs: &Pattern, pair: usize) -> Result<Subst, GenerationError> {
        let mut subst = Subst::default();
        for (var, source) in term_sources(lhs, pair) {
            let id = match source {
                TermSource::Fresh => self.fresh_term()?,
                TermSource::Recycled => self.recycled_term()?,
                TermSource::MaybeRecycled if self.random.roll_d2() => self.fresh_term()?,
                TermSource::MaybeRecycled => self.recycled_term()?,
            };
            subst.insert(var, id);
        }
        Ok(subst)
    }

    fn fresh_symbol(&mut self) -> Result<Symbol, GenerationError> {
        self.random
            .pick_one_unique(&self.config.terms, &mut self.used_terms)
            .ok_or(GenerationError::OutOfTerms)
    }

    fn fresh_term(&mut self) -> Result<Id, GenerationError> {
        let symbol = self.fresh_symbol()?;
        Ok(self.egraph.add_term(symbol))
    }

    fn recycled_term(&mut self) -> Result<Id, GenerationError> {
        match self
            .random
            .pick_one_unique(&self.recycled, &mut self.used_recycled)
        {
            Some(id) => Ok(id),
            None => self.fresh_term(),
        }
    }
}

/// Where the terms bound to each variable of a left-hand side come from,
/// for one of a level's four pairs.
///
/// The first pair illustrates the rule, the second is the question and
/// always gets a fresh term, the last two are recycled into later levels.
fn term_sources(lhs: &Pattern, pair: usize) -> Vec<(Symbol, TermSource)> {
    let vars = lhs.vars();
    let nested: IndexSet<Symbol> = lhs
        .children()
        .iter()
        .filter(|child| !child.children().is_empty())
        .flat_map(Pattern::vars)
        .collect();

    vars.iter()
        .enumerate()
        .map(|(i, &var)| {
            let source = if nested.is_empty() {
                match pair {
                    QUESTION_PAIR if i + 1 == vars.len() => TermSource::Fresh,
                    3 if i == 0 => TermSource::Fresh,
                    _ => TermSource::Recycled,
                }
            } else if let Some(k) = nested.get_index_of(&var) {
                match pair {
                    0 if k + 1 == nested.len() => TermSource::Fresh,
                    QUESTION_PAIR if k == 0 => TermSource::Fresh,
                    _ => TermSource::MaybeRecycled,
                }
            } else {
                TermSource::Recycled
            };
            (var, source)
        })
        .collect()
}

/// Turns the extracted hints of a level's classes into a [`Level`].
struct LevelAssembler<'a> {
    index: usize,
    is_last: bool,
    egraph: &'a EGraph,
    random: &'a mut Random,
}

impl LevelAssembler<'_> {
    fn assemble(
        mut self,
        hints: &HintsByClass,
        classes: &IndexSet<Id>,
        shown: &mut IndexSet<Symbol>,
        previous: Option<&Level>,
    ) -> Result<Level, GenerationError> {
        let level = self.index;

        let mut by_class: IndexMap<Id, Vec<Rc<Hint>>> = IndexMap::default();
        for (class, class_hints) in hints {
            if !classes.contains(class) {
                continue;
            }
            for hint in class_hints {
                if hint.num_new_operations(shown) <= 1 {
                    by_class.entry(*class).or_default().push(hint.clone());
                }
            }
        }
        let admissible: Vec<Rc<Hint>> = by_class.values().flatten().cloned().collect();
        if admissible.is_empty() {
            return Err(GenerationError::NoAdmissibleHints { level });
        }

        let mut question_class = None;
        let mut largest = 0;
        for (class, class_hints) in &by_class {
            if class_hints.len() > largest {
                largest = class_hints.len();
                question_class = Some(*class);
            }
        }
        let mut candidates = Vec::new();
        let mut others = Vec::new();
        for (class, class_hints) in &by_class {
            if Some(*class) == question_class {
                candidates.extend(class_hints.iter().cloned());
            } else {
                others.extend(class_hints.iter().cloned());
            }
        }

        candidates.sort_by_key(|hint| Reverse(question_score(hint, shown)));
        let question = candidates[0].clone();
        let new_operations = question.new_operations(shown);
        let &[operation] = new_operations.as_slice() else {
            return Err(GenerationError::NoQuestion { level });
        };
        shown.insert(operation);

        let mut answers = IndexSet::default();
        let mut answer_terms = IndexSet::default();
        let mut answer_operations = IndexSet::default();
        let mut decoys = IndexSet::default();
        for hint in &candidates {
            if Rc::ptr_eq(hint, &question) || hint.num_new_operations(shown) != 0 {
                continue;
            }
            answers.insert(hint.formatted.clone());
            answer_terms.extend(hint.term_symbols.iter().copied());
            answer_operations.extend(hint.operation_symbols.iter().copied());

            if let Some(&term) = self.random.pick_from_set(&answer_terms) {
                let mut decoy = Hint::clone(hint);
                decoy.replace_random_node(self.random, term);
                decoys.insert(decoy.formatted);
            }
        }
        if answers.is_empty() {
            return Err(GenerationError::NoAnswers { level });
        }
        decoys.retain(|decoy| !answers.contains(decoy) && !self.is_equal_to(decoy, &question));

        // hints in the same class that could be shown on the other side
        let partners = |hint: &Hint| {
            let members = by_class.get(&hint.root_id).map_or(0, Vec::len);
            members.saturating_sub(1 + usize::from(hint.root_id == question.root_id))
        };
        let mut hint_lhs = best(&admissible, |hint| {
            lhs_score(hint, partners(hint), &question, operation, shown)
        });
        let mut hint_rhs = best(&admissible, |hint| {
            rhs_score(hint, &hint_lhs, &question, operation, shown)
        });
        if hint_lhs.root_id != hint_rhs.root_id || Rc::ptr_eq(&hint_lhs, &hint_rhs) {
            return Err(GenerationError::NoHintPair { level });
        }
        if !hint_lhs.uses_operation(operation) && !hint_rhs.uses_operation(operation) {
            return Err(GenerationError::HintMissesOperation { level });
        }
        if hint_rhs.depth != question.depth && self.random.roll_d5() {
            std::mem::swap(&mut hint_lhs, &mut hint_rhs);
        }

        others.sort_by_key(|hint| Reverse(noise_score(hint, &hint_lhs, &hint_rhs, &answer_terms)));
        let suggestions = self.suggestions(&answers, &decoys, &others);

        let mut known_terms = previous.map(|l| l.known_terms.clone()).unwrap_or_default();
        let mut known_operations = previous
            .map(|l| l.known_operations.clone())
            .unwrap_or_default();
        for hint in &admissible {
            known_terms.extend(hint.term_symbols.iter().copied());
            known_operations.extend(hint.operation_symbols.iter().copied());
        }

        log::debug!(
            "Level {level}: {} = {}, question {}, {} answers, {} decoys",
            hint_lhs.formatted,
            hint_rhs.formatted,
            question.formatted,
            answers.len(),
            decoys.len()
        );

        Ok(Level {
            index: level,
            hint_lhs,
            hint_rhs,
            question,
            operation,
            answers,
            decoys,
            suggestions,
            hints: admissible,
            answer_terms,
            answer_operations,
            known_terms,
            known_operations,
        })
    }

    /// Whether a decoy happens to be in the question's class anyway.
    fn is_equal_to(&self, decoy: &str, question: &Hint) -> bool {
        match parse_expr(decoy) {
            Ok(pattern) => pattern
                .search_eclass(self.egraph, question.root_id)
                .is_some(),
            Err(_) => false,
        }
    }

    /// Level 0 is introductory, level 1 baits with more valid answers and
    /// the last level offers fewer valid answers and more decoys.
    fn suggestions(
        &mut self,
        answers: &IndexSet<String>,
        decoys: &IndexSet<String>,
        others: &[Rc<Hint>],
    ) -> Vec<String> {
        let num_answers = (3 + usize::from(self.index == 1) - usize::from(self.is_last)).min(answers.len());
        let num_decoys = (3 + usize::from(self.is_last)).min(decoys.len());

        let mut unique = IndexSet::default();
        let mut used = IndexSet::default();
        for _ in 0..num_answers {
            unique.extend(self.random.pick_one_unique(answers, &mut used));
        }
        for _ in 0..num_decoys {
            unique.extend(self.random.pick_one_unique(decoys, &mut used));
        }
        unique.extend(others.iter().take(3).map(|hint| hint.formatted.clone()));

        let mut suggestions: Vec<String> = unique.into_iter().collect();
        self.random.shuffle(&mut suggestions);
        suggestions
    }
}

/// The first of the highest scoring hints.
fn best(hints: &[Rc<Hint>], score: impl Fn(&Hint) -> i64) -> Rc<Hint> {
    let mut ranked = hints.to_vec();
    ranked.sort_by_key(|hint| Reverse(score(hint)));
    ranked[0].clone()
}

fn count(condition: bool) -> i64 {
    i64::from(condition)
}

fn question_score(hint: &Hint, shown: &IndexSet<Symbol>) -> i64 {
    -count(hint.num_new_operations(shown) != 1) * 100
        + hint.used_term_ids.len() as i64 * 10
        + hint.depth as i64
}

fn lhs_score(
    hint: &Hint,
    partners: usize,
    question: &Rc<Hint>,
    operation: Symbol,
    shown: &IndexSet<Symbol>,
) -> i64 {
    let mut score = 0;
    score -= count(partners == 0) * 5000;
    // the question's own class is all we have sometimes
    score -= count(std::ptr::eq(hint, question.as_ref())) * 10000;
    score -= count(hint.root_id == question.root_id) * 1000;
    score -= hint.num_new_operations(shown) as i64 * 100;
    score -= count(hint.depth == question.depth) * 20;
    score += hint.depth as i64 * 10;
    score += hint.operation_symbols.len() as i64 * 10;
    score += count(hint.uses_operation(operation));
    score
}

fn rhs_score(
    hint: &Hint,
    lhs: &Rc<Hint>,
    question: &Rc<Hint>,
    operation: Symbol,
    shown: &IndexSet<Symbol>,
) -> i64 {
    let mut score = 0;
    score -= count(std::ptr::eq(hint, question.as_ref()) || std::ptr::eq(hint, lhs.as_ref())) * 10000;
    score -= count(hint.root_id != lhs.root_id) * 5000;
    score -= count(hint.root_id == question.root_id) * 1000;
    score -= hint.num_new_operations(shown) as i64 * 100;
    score -= count(hint.depth == question.depth) * 20;
    score += hint.operation_symbols.len() as i64 * 10;
    score += count(hint.uses_operation(operation));

    let first = |h: &Hint| h.root.children.first().map(|c| c.symbol);
    let last = |h: &Hint| h.root.children.last().map(|c| c.symbol);
    if hint.depth > 1 && lhs.depth > 1 && (first(hint) == first(lhs) || last(hint) == last(lhs)) {
        score -= 10;
    }
    score -= count(hint.term_symbols == lhs.term_symbols);
    score -= count(hint.depth == lhs.depth);
    score
}

/// Noise should look like the answers without repeating the hint.
fn noise_score(hint: &Hint, lhs: &Hint, rhs: &Hint, answer_terms: &IndexSet<Symbol>) -> i64 {
    -count(hint.formatted == lhs.formatted || hint.formatted == rhs.formatted) * 10
        - hint.num_new_terms(answer_terms) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::AstNode;
    use crate::properties::PropertyKind;

    fn hint(root: AstNode, root_id: usize) -> Hint {
        Hint::new(Id::from(root_id), Id::from(root_id), root, IndexSet::default())
    }

    fn op(symbol: &str, l: AstNode, r: AstNode) -> AstNode {
        AstNode::op(symbol, l, r)
    }

    fn leaf(symbol: &str) -> AstNode {
        AstNode::leaf(symbol)
    }

    #[test]
    fn question_pair_always_has_a_fresh_term() {
        let shapes = [
            "$x . $x => $x",
            "$x . $y => $y . $x",
            "($x . $y) . $z => $x . ($y . $z)",
            "$x . ($y . $z) => ($x . $y) . $z",
            "$x . I => $x",
        ];
        for template in shapes {
            let rule = crate::parse::parse_rewrite("rule", template).unwrap();
            let sources = term_sources(&rule.lhs, QUESTION_PAIR);
            assert_eq!(sources.len(), rule.lhs.vars().len());
            assert!(
                sources.iter().any(|(_, s)| *s == TermSource::Fresh),
                "{template}"
            );
        }
    }

    #[test]
    fn nested_variables_are_maybe_recycled() {
        let rule = crate::parse::parse_rewrite("rule", "($x . $y) . $z => $x . ($y . $z)").unwrap();
        let sources: Vec<TermSource> = term_sources(&rule.lhs, 2).into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            sources,
            vec![
                TermSource::MaybeRecycled,
                TermSource::MaybeRecycled,
                TermSource::Recycled
            ]
        );
    }

    #[test]
    fn question_prefers_exactly_one_new_operation() {
        let shown: IndexSet<Symbol> = [Symbol::from("@")].into_iter().collect();
        let old = hint(op("@", op("@", leaf("a"), leaf("b")), leaf("c")), 0);
        let new = hint(op("~>", leaf("a"), leaf("b")), 0);
        assert!(question_score(&new, &shown) > question_score(&old, &shown));
    }

    #[test]
    fn rhs_avoids_the_lhs() {
        let shown = IndexSet::default();
        let question = Rc::new(hint(op("~>", leaf("q"), leaf("w")), 1));
        let lhs = Rc::new(hint(op("~>", leaf("a"), leaf("b")), 0));
        let twin = hint(op("~>", leaf("a"), leaf("c")), 0);
        let other = hint(op("~>", leaf("c"), leaf("d")), 0);
        let operation = Symbol::from("~>");
        assert!(
            rhs_score(&other, &lhs, &question, operation, &shown)
                > rhs_score(&twin, &lhs, &question, operation, &shown)
        );
        assert!(
            rhs_score(&twin, &lhs, &question, operation, &shown)
                > rhs_score(&lhs, &lhs, &question, operation, &shown)
        );
    }

    #[test]
    fn hint_sides_come_from_one_class() {
        let shown = IndexSet::default();
        let operation = Symbol::from("~>");
        let question = Rc::new(hint(op("~>", leaf("q"), leaf("w")), 2));
        // deeper, but alone in its class
        let lonely = hint(op("~>", op("~>", leaf("a"), leaf("b")), leaf("c")), 0);
        let paired = hint(op("~>", leaf("d"), leaf("e")), 1);
        assert!(
            lhs_score(&paired, 1, &question, operation, &shown)
                > lhs_score(&lonely, 0, &question, operation, &shown)
        );

        let lhs = Rc::new(paired);
        let same_class = hint(op("~>", leaf("e"), leaf("d")), 1);
        assert!(
            rhs_score(&same_class, &lhs, &question, operation, &shown)
                > rhs_score(&lonely, &lhs, &question, operation, &shown)
        );
    }

    #[test]
    fn generates_four_levels() {
        let _ = env_logger::builder().is_test(true).try_init();
        let quest = QuestGenerator::default().generate(Seed::new(1234)).unwrap();
        assert_eq!(quest.levels.len(), 4);
        assert!(quest.report.attempts >= 1);
        for level in &quest.levels {
            assert!(!level.answers.is_empty());
            assert!(!level.answers.contains(&level.question.formatted));
            assert!(level.decoys.is_disjoint(&level.answers));
            assert!(level.hint_lhs.uses_operation(level.operation) || level.hint_rhs.uses_operation(level.operation));
            assert!(level.known_operations.contains(&level.operation));
        }
    }

    #[test]
    fn too_many_levels_exhaust_retries() {
        let config = QuestConfig {
            num_levels: 2,
            max_attempts: 3,
            properties: PROPERTIES
                .iter()
                .filter(|p| p.kind == PropertyKind::Idempotence)
                .copied()
                .collect(),
            ..Default::default()
        };
        match QuestGenerator::new(config).generate(Seed::new(1)) {
            Err(crate::Error::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, GenerationError::NoProperty { level: 1 });
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
    }
}
