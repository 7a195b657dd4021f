//! Line-oriented text protocol for driving the engine.
//!
//! Modeled on GTP: one command per line, an optional numeric id in front,
//! and responses of the form `=id message` on success or `?id message` on
//! failure, each followed by a blank line.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version` - Engine identification
//! - `list_commands`, `known_command <cmd>` - Command discovery
//! - `quit` - Exit the loop
//! - `variant <name>` - Switch rule set (historical, copenhagen, mini) and reset
//! - `clear_board` - Reset to the starting position
//! - `play <from> <to>` - Play a move for the side to move, e.g. `play d1 d3`
//! - `genmove` - Search, play and print a move for the side to move
//! - `showboard` - Print the board
//! - `legal_moves` - List legal moves for the side to move
//! - `status` - `ongoing`, `attacker wins` or `defender wins`

use std::io::{self, BufRead, Write};

use anyhow::Context;
use tracing::info;

use crate::board::Player;
use crate::mcts::{Mcts, MctsConfig};
use crate::position::{Action, Position, Variant};
use crate::priors::{PriorPolicy, UniformPrior};

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "clear_board",
    "genmove",
    "known_command",
    "legal_moves",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "status",
    "variant",
    "version",
];

/// Protocol engine state.
pub struct ProtocolEngine {
    variant: Variant,
    pos: Position,
    mcts: Mcts<Box<dyn PriorPolicy>>,
}

impl ProtocolEngine {
    pub fn new(variant: Variant, config: MctsConfig, prior: Box<dyn PriorPolicy>) -> Self {
        Self {
            variant,
            pos: Position::new(variant),
            mcts: Mcts::with_prior(config, prior),
        }
    }

    /// Engine with uniform priors and the given number of passes per move.
    pub fn with_simulations(variant: Variant, n_sims: usize) -> Self {
        Self::new(
            variant,
            MctsConfig::with_simulations(n_sims),
            Box::new(UniformPrior),
        )
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Run the command loop on stdin/stdout.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run the command loop on arbitrary streams until `quit` or end of input.
    pub fn run_with<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read command")?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();

            writeln!(output, "{prefix}{id_str} {message}\n").context("failed to write response")?;
            output.flush().context("failed to flush response")?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command id from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end > 0 {
            if let Ok(id) = trimmed[..end].parse::<u32>() {
                return (Some(id), trimmed[end..].trim());
            }
        }
        (None, trimmed)
    }

    /// Execute a command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "1".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
                None => (false, "missing argument".to_string()),
            },

            "quit" => (true, String::new()),

            "variant" => {
                let Some(name) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                match name.parse::<Variant>() {
                    Ok(variant) => {
                        self.variant = variant;
                        self.pos = Position::new(variant);
                        (true, String::new())
                    }
                    Err(e) => (false, e.to_string()),
                }
            }

            "clear_board" => {
                self.pos = Position::new(self.variant);
                (true, String::new())
            }

            "play" => {
                if args.len() < 2 {
                    return (false, "missing arguments".to_string());
                }
                let action = match Action::parse(&args[..2].join(" "), self.pos.size()) {
                    Ok(action) => action,
                    Err(e) => return (false, e.to_string()),
                };
                match self.pos.apply_move(action) {
                    Ok(_) => (true, String::new()),
                    Err(_) => (false, "illegal move".to_string()),
                }
            }

            "genmove" => {
                if self.pos.done {
                    return (false, "game is over".to_string());
                }
                let summary = self.mcts.think(&self.pos);
                let Some(action) = summary.best_move else {
                    return (false, "no legal moves".to_string());
                };
                if let Err(e) = self.pos.apply_move(action) {
                    return (false, e.to_string());
                }
                let text = action.to_text(self.pos.size());
                info!(action = %text, tree_size = summary.tree_size, "generated move");
                (true, text)
            }

            "showboard" => (true, format!("\n{}", self.pos)),

            "legal_moves" => {
                let size = self.pos.size();
                let moves: Vec<String> = self
                    .pos
                    .legal_moves()
                    .into_iter()
                    .map(|a| a.to_text(size))
                    .collect();
                (true, moves.join(" "))
            }

            "status" => {
                let status = match self.pos.winner() {
                    None => "ongoing",
                    Some(Player::Attacker) => "attacker wins",
                    Some(Player::Defender) => "defender wins",
                };
                (true, status.to_string())
            }

            _ => (false, format!("unknown command: {command}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ProtocolEngine {
        ProtocolEngine::with_simulations(Variant::Mini, 50)
    }

    #[test]
    fn test_parse_id_with_id() {
        let (id, cmd) = ProtocolEngine::parse_id("123 name");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_parse_id_without_id() {
        let (id, cmd) = ProtocolEngine::parse_id("name");
        assert_eq!(id, None);
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_known_command() {
        let mut engine = engine();
        assert_eq!(engine.execute("known_command", &["genmove"]), (true, "true".to_string()));
        assert_eq!(engine.execute("known_command", &["boardsize"]), (true, "false".to_string()));
    }

    #[test]
    fn test_variant_switch() {
        let mut engine = engine();
        let (success, _) = engine.execute("variant", &["historical"]);
        assert!(success);
        assert_eq!(engine.position().size(), 9);

        let (success, message) = engine.execute("variant", &["tablut"]);
        assert!(!success);
        assert!(message.contains("tablut"));
    }

    #[test]
    fn test_play_and_clear() {
        let mut engine = engine();
        // b5 is (0, 1) on the mini board; a5 is the corner next to it.
        let (success, _) = engine.execute("play", &["b5", "a5"]);
        assert!(success);
        assert_eq!(engine.position().turn(), Player::Defender);

        let (success, message) = engine.execute("play", &["a5", "b5"]);
        assert!(!success, "attacker piece cannot move on the defender's turn");
        assert_eq!(message, "illegal move");

        let (success, _) = engine.execute("clear_board", &[]);
        assert!(success);
        assert_eq!(engine.position(), &Position::new(Variant::Mini));
    }

    #[test]
    fn test_genmove_plays_legal_move() {
        let mut engine = engine();
        let before = engine.position().clone();
        let (success, text) = engine.execute("genmove", &[]);
        assert!(success);
        let action = Action::parse(&text, 5).unwrap();
        assert!(before.legal_moves().contains(&action));
        assert_eq!(engine.position().move_count, 1);
    }

    #[test]
    fn test_run_with_ids_and_quit() {
        let mut engine = engine();
        let input = b"1 name\n# comment\n2 status\n3 quit\n4 name\n";
        let mut output = Vec::new();
        engine.run_with(&input[..], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("=1 hnef-rust"));
        assert!(text.contains("=2 ongoing"));
        assert!(text.contains("=3 "));
        assert!(!text.contains("=4"));
    }
}
