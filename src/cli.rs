use crate::*;

/// Prints the game to stdout.
pub struct Console {
    pub show_answers: bool,
}

#[allow(clippy::disallowed_macros)]
impl Frontend for Console {
    fn on_generated(&mut self, report: &GenerationReport) {
        println!("Quest {} ({} classes)", report.seed, report.classes);
    }

    fn on_start_game(&mut self) {
        println!("Each level shows two equal expressions. Find expressions equal to the question.");
        println!("Type an expression, or the number of a suggestion. Wrap a lone digit term in brackets.");
    }

    fn on_start_level(&mut self, level: usize, hint: &str, question: &str, suggestions: &[String]) {
        println!();
        println!("Level {}", level + 1);
        println!("    {hint}");
        println!("    {question} = ?");
        for (i, suggestion) in suggestions.iter().enumerate() {
            println!("  {}. {suggestion}", i + 1);
        }
    }

    fn on_error(&mut self, message: &str) {
        println!("{message}");
    }

    fn on_validate_answer(&mut self, answer: &str, valid: bool, score: usize) {
        if valid {
            println!("{answer}: correct! score {score}");
        } else {
            println!("{answer}: wrong");
        }
    }

    fn on_end_level(&mut self, passed: bool, valid_suggestions: &[bool]) {
        let valid: Vec<String> = valid_suggestions
            .iter()
            .enumerate()
            .filter(|(_, &v)| v)
            .map(|(i, _)| (i + 1).to_string())
            .collect();
        if passed {
            println!("Level passed");
        } else {
            println!("Level failed, the right suggestions were {}", util::ListDisplay(&valid, ", "));
        }
    }

    fn on_end_game(&mut self, win: bool) {
        println!("{}", if win { "You win!" } else { "Game over" });
    }
}

/// Reads one answer per line; a number picks a suggestion.
pub fn read_answer(line: &str) -> Option<Answer> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else if let Ok(n) = line.parse::<usize>() {
        Some(Answer::Suggestion(n.saturating_sub(1)))
    } else {
        Some(Answer::Expression(line.to_string()))
    }
}

#[cfg(feature = "bin")]
pub mod bin {
    use super::*;
    use clap::Parser;
    use std::io::{self, BufRead};

    #[derive(Debug, Parser)]
    #[command(version = env!("FULL_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
    struct Args {
        /// Eight characters from a previous quest, random if omitted
        #[clap(short, long)]
        seed: Option<Seed>,
        /// Stored in the seed, 0 to 15
        #[clap(short, long, value_parser = clap::value_parser!(u8).range(0..16))]
        difficulty: Option<u8>,
        /// At least 1
        #[clap(long, default_value_t = 4, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        levels: usize,
        /// Generation attempts before giving up
        #[clap(long, default_value_t = 1000)]
        max_attempts: usize,
        /// Lists the answers of every level, for debugging
        #[clap(long)]
        show_answers: bool,
        /// Uses the Unicode operations of the browser version
        #[clap(long)]
        web_symbols: bool,
    }

    /// Generates a quest and plays it on the console.
    #[allow(clippy::disallowed_macros)]
    pub fn cli() {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .format_timestamp(None)
            .format_target(false)
            .parse_default_env()
            .init();

        let args = Args::parse();
        let mut seed = args.seed.unwrap_or_else(Seed::random);
        if let Some(difficulty) = args.difficulty {
            seed.difficulty = difficulty;
        }

        let mut config = if args.web_symbols {
            QuestConfig::web()
        } else {
            QuestConfig::default()
        };
        config.num_levels = args.levels;
        config.max_attempts = args.max_attempts;

        let frontend = Console {
            show_answers: args.show_answers,
        };
        let mut game = Game::new(QuestGenerator::new(config), frontend);
        if let Err(err) = game.generate(seed) {
            log::error!("{err}");
            std::process::exit(1)
        }

        let mut shown_answers = None;
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        while !game.is_over() {
            if let Some(level) = game.current_level() {
                if game.frontend().show_answers && shown_answers != Some(level.index) {
                    println!("Answers: {}", util::ListDisplay(&level.answers, ", "));
                    shown_answers = Some(level.index);
                }
            }

            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    log::error!("{err}");
                    std::process::exit(1)
                }
                None => break,
            };
            let Some(answer) = read_answer(&line) else {
                continue;
            };
            if let Err(err) = game.validate_answer(answer) {
                println!("{err}");
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pick_suggestions() {
        assert_eq!(read_answer(" 2 "), Some(Answer::Suggestion(1)));
        assert_eq!(read_answer("a ~> b"), Some(Answer::Expression("a ~> b".into())));
        assert_eq!(read_answer("(3)"), Some(Answer::Expression("(3)".into())));
        assert_eq!(read_answer("   "), None);
    }
}
