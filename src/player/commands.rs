// Command interpreter: one line of user input -> one session operation
// The table below is the whole contract; parsing has no state.

use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    TogglePause,
    Restart,
    ToggleAutoAdvance,
    // Raw value; the session range-checks it so a bad value can be reported
    // without touching the current volume
    SetVolume(i64),
    VolumeUp,
    VolumeDown,
    Status,
    Help,
    Quit,
}

// Step used by the +/- shortcuts
pub const VOLUME_STEP: u8 = 10;

pub const HELP: &str = "[n] Next | [b] Previous | [p] Pause/Resume | [r] Restart | \
[a] Auto-advance on/off | [v N] Volume 0-100 | [+/-] Volume | [s] Status | [q] Quit";

impl Command {
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();
        let token = parts.next().unwrap_or("").to_lowercase();
        let arg = parts.next();

        let command = match token.as_str() {
            "n" | "next" => Command::Next,
            "b" | "prev" | "previous" => Command::Previous,
            "p" | "pause" | "resume" => Command::TogglePause,
            "r" | "restart" => Command::Restart,
            "a" | "auto" => Command::ToggleAutoAdvance,
            "+" => Command::VolumeUp,
            "-" => Command::VolumeDown,
            "s" | "status" => Command::Status,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            "v" | "vol" | "volume" => {
                let raw = arg.unwrap_or("");
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| CommandError::InvalidVolume(raw.to_string()))?;
                return match parts.next() {
                    None => Ok(Command::SetVolume(value)),
                    Some(_) => Err(CommandError::InvalidVolume(input.to_string())),
                };
            }
            _ => return Err(CommandError::Unknown(input.to_string())),
        };

        // Only the volume command takes an argument
        match arg {
            None => Ok(command),
            Some(_) => Err(CommandError::Unknown(input.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_token_maps_to_its_command() {
        let table = [
            ("n", Command::Next),
            ("next", Command::Next),
            ("b", Command::Previous),
            ("prev", Command::Previous),
            ("previous", Command::Previous),
            ("p", Command::TogglePause),
            ("pause", Command::TogglePause),
            ("resume", Command::TogglePause),
            ("r", Command::Restart),
            ("restart", Command::Restart),
            ("a", Command::ToggleAutoAdvance),
            ("auto", Command::ToggleAutoAdvance),
            ("+", Command::VolumeUp),
            ("-", Command::VolumeDown),
            ("s", Command::Status),
            ("h", Command::Help),
            ("?", Command::Help),
            ("q", Command::Quit),
            ("exit", Command::Quit),
        ];
        for (token, expected) in table {
            assert_eq!(Command::parse(token), Ok(expected), "token {token:?}");
        }
    }

    #[test]
    fn tokens_are_case_insensitive_and_trimmed() {
        assert_eq!(Command::parse("  NEXT \n"), Ok(Command::Next));
        assert_eq!(Command::parse("Q"), Ok(Command::Quit));
        assert_eq!(Command::parse("Volume 70"), Ok(Command::SetVolume(70)));
    }

    #[test]
    fn volume_takes_any_integer() {
        assert_eq!(Command::parse("v 0"), Ok(Command::SetVolume(0)));
        assert_eq!(Command::parse("v 100"), Ok(Command::SetVolume(100)));
        // range is the session's job
        assert_eq!(Command::parse("v 150"), Ok(Command::SetVolume(150)));
        assert_eq!(Command::parse("v -5"), Ok(Command::SetVolume(-5)));
    }

    #[test]
    fn bad_volume_arguments_are_rejected() {
        assert_eq!(
            Command::parse("v loud"),
            Err(CommandError::InvalidVolume("loud".into()))
        );
        assert_eq!(Command::parse("v"), Err(CommandError::InvalidVolume("".into())));
        assert!(matches!(
            Command::parse("v 10 20"),
            Err(CommandError::InvalidVolume(_))
        ));
    }

    #[test]
    fn unknown_input_is_rejected() {
        assert_eq!(Command::parse("x"), Err(CommandError::Unknown("x".into())));
        assert_eq!(Command::parse(""), Err(CommandError::Unknown("".into())));
        assert_eq!(
            Command::parse("next please"),
            Err(CommandError::Unknown("next please".into()))
        );
    }
}
