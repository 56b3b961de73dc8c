#[derive(Debug, PartialEq, Eq)]
pub(super) enum Command {
    Uci,
    Debug {
        on: bool,
    },
    IsReady,
    SetOption {
        option: EngineOption,
        value: OptionValue,
    },
    SetPosition {
        fen: Option<String>,
        moves: Vec<String>,
    },
    NewGame,
    Go {
        nodes: Option<u32>,
    },
    Stop,
    Quit,
    /// Non-standard command printing the current position.
    Display,
    Unknown(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(super) enum EngineOption {
    Cycles,
    Capacity,
    Seed,
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum OptionValue {
    Integer(u64),
    String(String),
}

/// Only `nodes` limits the search: it is the number of MCTS cycles. Clock
/// and depth limits are consumed together with their arguments and ignored.
fn parse_go(parts: &[&str]) -> Command {
    let mut nodes = None;

    let mut i = 1;

    while i < parts.len() {
        if parts[i] == "nodes" && i + 1 < parts.len() {
            nodes = parts[i + 1].parse().ok();
        }
        if matches!(parts[i], "infinite" | "ponder") {
            i += 1;
        } else {
            i += 2;
        }
    }

    Command::Go { nodes }
}

fn parse_setoption(parts: &[&str]) -> Command {
    if parts.len() > 3 && parts[1] == "name" {
        let name_end = parts
            .iter()
            .position(|&x| x == "value")
            .unwrap_or(parts.len());
        let option = parts[2..name_end].join(" ");
        let option = match option.as_str() {
            "Cycles" => EngineOption::Cycles,
            "Capacity" => EngineOption::Capacity,
            "Seed" => EngineOption::Seed,
            _ => return Command::Unknown(parts.join(" ")),
        };
        let value = if name_end + 1 < parts.len() {
            let raw = parts[name_end + 1..].join(" ");
            match (option, raw.parse::<u64>()) {
                (_, Ok(value)) => Some(OptionValue::Integer(value)),
                (EngineOption::Seed, Err(_)) => Some(OptionValue::String(raw)),
                (EngineOption::Cycles | EngineOption::Capacity, Err(_)) => None,
            }
        } else {
            None
        };
        if let Some(value) = value {
            Command::SetOption { option, value }
        } else {
            Command::Unknown(parts.join(" "))
        }
    } else {
        Command::Unknown(parts.join(" "))
    }
}

fn parse_setposition(parts: &[&str]) -> Command {
    let fen_index = parts.iter().position(|&x| x == "fen");
    let moves_index = parts.iter().position(|&x| x == "moves");
    let fen = fen_index.map(|index| parts[index + 1..moves_index.unwrap_or(parts.len())].join(" "));
    let moves = moves_index.map_or_else(Vec::new, |moves_index| {
        parts[moves_index + 1..]
            .iter()
            .map(ToString::to_string)
            .collect()
    });
    Command::SetPosition { fen, moves }
}

impl Command {
    pub(super) fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            return Self::Unknown(String::new());
        }

        match parts[0] {
            "uci" => Self::Uci,
            "debug" if parts.len() > 1 => Self::Debug {
                on: parts[1] == "on",
            },
            "isready" => Self::IsReady,
            "setoption" => parse_setoption(&parts),
            "position" => parse_setposition(&parts),
            "ucinewgame" => Self::NewGame,
            "go" => parse_go(&parts),
            "stop" => Self::Stop,
            "quit" => Self::Quit,
            "d" => Self::Display,
            _ => Self::Unknown(input.trim().to_string()),
        }
    }
}
