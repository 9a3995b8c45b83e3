//! Timeline steps parsed from the command line.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use skyroute_core::transit::{RouteIdentifier, StationCode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Open(StationCode),
    Close(StationCode),
    Select(RouteIdentifier),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Open(code) => write!(f, "open {code}"),
            Action::Close(code) => write!(f, "close {code}"),
            Action::Select(id) => write!(f, "select {id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub at: Duration,
    pub action: Action,
}

impl FromStr for Step {
    type Err = String;

    /// `<millis>:<open|close|select>:<code or route id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(at), Some(verb), Some(target)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected <millis>:<action>:<target>, got {s:?}"));
        };

        let millis: u64 = at
            .trim()
            .parse()
            .map_err(|_| format!("invalid time {at:?} in step {s:?}"))?;
        let target = target.trim();
        if target.is_empty() {
            return Err(format!("missing target in step {s:?}"));
        }

        let action = match verb.trim() {
            "open" => Action::Open(StationCode::new(target)),
            "close" => Action::Close(StationCode::new(target)),
            "select" => Action::Select(RouteIdentifier::new(target)),
            other => return Err(format!("unknown action {other:?} in step {s:?}")),
        };

        Ok(Step {
            at: Duration::from_millis(millis),
            action,
        })
    }
}
