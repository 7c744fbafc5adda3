use std::str::FromStr;

/// What happens to a still-running target when the debugger quits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitPolicy {
    Kill,
    Detach,
}

impl FromStr for QuitPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "kill" => Ok(Self::Kill),
            "detach" => Ok(Self::Detach),
            _ => Err("no such quit policy, expected kill or detach"),
        }
    }
}
