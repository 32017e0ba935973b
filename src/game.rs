use crate::{
    parse::parse_expr,
    quest::{GenerationReport, Level, Quest, QuestGenerator},
    seed::Seed,
    util::IndexSet,
    Error,
};

/// Receives everything a player should see.
///
/// Implemented by the console and browser front ends, and by tests.
pub trait Frontend {
    fn on_generated(&mut self, _report: &GenerationReport) {}
    fn on_start_game(&mut self) {}
    fn on_start_level(&mut self, level: usize, hint: &str, question: &str, suggestions: &[String]);
    fn on_show_hint(&mut self, _hint: &str) {}
    fn on_show_question(&mut self, _question: &str) {}
    /// A message to display. The game state is unchanged.
    fn on_error(&mut self, message: &str);
    fn on_validate_answer(&mut self, answer: &str, valid: bool, score: usize);
    /// `valid_suggestions[i]` tells whether suggestion `i` was a right answer.
    fn on_end_level(&mut self, passed: bool, valid_suggestions: &[bool]);
    fn on_end_game(&mut self, win: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Expression(String),
    /// An index into the current level's suggestions.
    Suggestion(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Valid, but given before. Nothing happens.
    AlreadyAccepted,
    /// Wrong. The game is over.
    Invalid,
    /// Not an answer at all, such as a typo or the question itself.
    Rejected,
}

#[derive(Debug, Clone, Default)]
struct Progress {
    level: usize,
    accepted: IndexSet<String>,
    valid_suggestions: Vec<bool>,
    score: usize,
    over: bool,
}

/// One play session over a generated quest.
///
/// The quest's egraph is never modified after generation; answers are
/// checked by matching them against the question's class.
pub struct Game<F> {
    generator: QuestGenerator,
    frontend: F,
    quest: Option<Quest>,
    progress: Progress,
}

impl<F: Frontend> Game<F> {
    pub fn new(generator: QuestGenerator, frontend: F) -> Self {
        Game {
            generator,
            frontend,
            quest: None,
            progress: Progress::default(),
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn quest(&self) -> Option<&Quest> {
        self.quest.as_ref()
    }

    pub fn current_level(&self) -> Option<&Level> {
        self.quest.as_ref()?.levels.get(self.progress.level)
    }

    pub fn score(&self) -> usize {
        self.progress.score
    }

    pub fn is_over(&self) -> bool {
        self.progress.over
    }

    /// Replaces any previous quest and starts at its first level.
    pub fn generate(&mut self, seed: Seed) -> Result<(), Error> {
        let quest = self.generator.generate(seed)?;
        self.frontend.on_generated(&quest.report);
        self.quest = Some(quest);
        self.progress = Progress::default();
        self.frontend.on_start_game();
        self.start_level(0);
        Ok(())
    }

    pub fn validate_answer(&mut self, answer: Answer) -> Result<Verdict, Error> {
        let level = self.current_level().ok_or(Error::NotGenerated)?;
        if self.progress.over {
            return Err(Error::GameOver);
        }

        let question = level.question.formatted.clone();
        let text = match answer {
            Answer::Expression(text) => text,
            Answer::Suggestion(index) => level
                .suggestions
                .get(index)
                .cloned()
                .ok_or(Error::SuggestionOutOfRange {
                    index,
                    len: level.suggestions.len(),
                })?,
        };

        let pattern = match parse_expr(&text) {
            Ok(pattern) => pattern,
            Err(err) => {
                self.frontend.on_error(&err.to_string());
                return Ok(Verdict::Rejected);
            }
        };
        let formatted = pattern.to_string();
        if formatted == question {
            self.frontend
                .on_error("The question is not an answer to itself");
            return Ok(Verdict::Rejected);
        }
        if self.progress.accepted.contains(&formatted) {
            return Ok(Verdict::AlreadyAccepted);
        }

        let valid = self.is_valid(&formatted);
        if valid {
            self.progress.accepted.insert(formatted.clone());
            self.progress.score += 1;
        }
        self.frontend
            .on_validate_answer(&formatted, valid, self.progress.score);

        if !valid {
            self.end_level(false);
            return Ok(Verdict::Invalid);
        }

        let needed = self
            .progress
            .valid_suggestions
            .iter()
            .filter(|&&v| v)
            .count()
            .max(1);
        if self.progress.accepted.len() >= needed {
            self.end_level(true);
        }
        Ok(Verdict::Valid)
    }

    /// Whether an expression is in the current question's class.
    pub fn is_valid(&self, expression: &str) -> bool {
        let (Some(quest), Some(level)) = (self.quest.as_ref(), self.current_level()) else {
            return false;
        };
        match parse_expr(expression) {
            Ok(pattern) => pattern
                .search_eclass(&quest.egraph, level.question_class())
                .is_some(),
            Err(_) => false,
        }
    }

    fn start_level(&mut self, index: usize) {
        self.progress.level = index;
        self.progress.accepted.clear();

        let Some(level) = self.current_level() else {
            return;
        };
        let hint = level.formatted_hint();
        let question = level.question.formatted.clone();
        let suggestions = level.suggestions.clone();
        let valid_suggestions = suggestions.iter().map(|s| self.is_valid(s)).collect();
        self.progress.valid_suggestions = valid_suggestions;

        log::debug!("Starting level {index}");
        self.frontend
            .on_start_level(index, &hint, &question, &suggestions);
        self.frontend.on_show_hint(&hint);
        self.frontend.on_show_question(&question);
    }

    fn end_level(&mut self, passed: bool) {
        let valid_suggestions = std::mem::take(&mut self.progress.valid_suggestions);
        self.frontend.on_end_level(passed, &valid_suggestions);

        let num_levels = self.quest.as_ref().map_or(0, |q| q.levels.len());
        if !passed {
            self.progress.over = true;
            self.frontend.on_end_game(false);
        } else if self.progress.level + 1 >= num_levels {
            self.progress.over = true;
            self.frontend.on_end_game(true);
        } else {
            self.start_level(self.progress.level + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        levels: usize,
    }

    impl Frontend for Recorder {
        fn on_start_game(&mut self) {
            self.events.push("start".into());
        }

        fn on_start_level(&mut self, level: usize, _: &str, _: &str, _: &[String]) {
            self.levels += 1;
            self.events.push(format!("level {level}"));
        }

        fn on_error(&mut self, message: &str) {
            self.events.push(format!("error {message}"));
        }

        fn on_validate_answer(&mut self, _: &str, valid: bool, score: usize) {
            self.events.push(format!("answer {valid} {score}"));
        }

        fn on_end_level(&mut self, passed: bool, _: &[bool]) {
            self.events.push(format!("end level {passed}"));
        }

        fn on_end_game(&mut self, win: bool) {
            self.events.push(format!("end game {win}"));
        }
    }

    fn game() -> Game<Recorder> {
        let mut game = Game::new(QuestGenerator::default(), Recorder::default());
        game.generate(Seed::new(77)).unwrap();
        game
    }

    #[test]
    fn validation_needs_a_quest() {
        let mut game = Game::new(QuestGenerator::default(), Recorder::default());
        assert!(matches!(
            game.validate_answer(Answer::Suggestion(0)),
            Err(Error::NotGenerated)
        ));
    }

    #[test]
    fn answering_every_level_wins() {
        let mut game = game();
        while !game.is_over() {
            let level = game.current_level().unwrap();
            let answers: Vec<String> = level.answers.iter().cloned().collect();
            let index = level.index;
            for answer in answers {
                if game.is_over() || game.current_level().unwrap().index != index {
                    break;
                }
                let verdict = game.validate_answer(Answer::Expression(answer)).unwrap();
                assert_eq!(verdict, Verdict::Valid);
            }
        }
        assert_eq!(game.frontend().events.last().unwrap(), "end game true");
        assert_eq!(game.frontend().levels, 4);
    }

    #[test]
    fn repeated_answers_are_ignored() {
        let mut game = game();
        let level = game.current_level().unwrap();
        let valid = level
            .suggestions
            .iter()
            .filter(|s| game.is_valid(s))
            .count();
        let answer = level.answers[0].clone();
        let question = level.question.formatted.clone();

        assert_eq!(
            game.validate_answer(Answer::Expression(question)).unwrap(),
            Verdict::Rejected
        );
        assert_eq!(
            game.validate_answer(Answer::Expression("a ~>".into())).unwrap(),
            Verdict::Rejected
        );
        if valid > 1 {
            assert_eq!(
                game.validate_answer(Answer::Expression(answer.clone())).unwrap(),
                Verdict::Valid
            );
            assert_eq!(
                game.validate_answer(Answer::Expression(answer)).unwrap(),
                Verdict::AlreadyAccepted
            );
            assert_eq!(game.score(), 1);
        }
        assert!(!game.is_over());
    }

    #[test]
    fn a_wrong_answer_ends_the_game() {
        let mut game = game();
        let level = game.current_level().unwrap();
        let len = level.suggestions.len();
        let wrong = level
            .suggestions
            .iter()
            .position(|s| !game.is_valid(s));

        assert!(matches!(
            game.validate_answer(Answer::Suggestion(len)),
            Err(Error::SuggestionOutOfRange { .. })
        ));
        if let Some(index) = wrong {
            assert_eq!(
                game.validate_answer(Answer::Suggestion(index)).unwrap(),
                Verdict::Invalid
            );
            assert!(game.is_over());
            assert_eq!(game.frontend().events.last().unwrap(), "end game false");
            assert!(matches!(
                game.validate_answer(Answer::Suggestion(0)),
                Err(Error::GameOver)
            ));
        }
    }
}
