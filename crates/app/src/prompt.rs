//! Maps typed lines to session commands.

use services::{SessionCommand, ViolationChoice};

pub const HELP: &str = "\
  1..9          select an option
  n / p         next / previous question
  g <number>    go to question
  start         start the exam
  cancel        cancel before starting
  submit        submit (asks again if questions are unanswered)
  submit!       submit anyway
  review        review answers (practice)
  save <name>   save your result to the leaderboard
  return / end  answer a fullscreen warning
  fs on|off     report a fullscreen change
  q             leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(SessionCommand),
    Help,
    Empty,
    Unknown(String),
}

#[must_use]
pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match (word.to_ascii_lowercase().as_str(), rest) {
        ("", _) => return Input::Empty,
        ("?" | "h" | "help", _) => return Input::Help,
        ("n" | "next", "") => SessionCommand::Next,
        ("p" | "prev" | "previous", "") => SessionCommand::Previous,
        ("g" | "goto", number) => match one_based(number) {
            Some(index) => SessionCommand::JumpTo(index),
            None => return Input::Unknown(line.to_owned()),
        },
        ("start", "") => SessionCommand::StartExam,
        ("cancel", "") => SessionCommand::CancelStart,
        ("submit", "") => SessionCommand::Submit { confirmed: false },
        ("submit!", "") | ("submit", "anyway") => SessionCommand::Submit { confirmed: true },
        ("review", "") => SessionCommand::Review,
        ("save", name) if !name.is_empty() => SessionCommand::SaveResult {
            participant: name.to_owned(),
        },
        ("return", "") => SessionCommand::ResolveViolation(ViolationChoice::ReturnToFullscreen),
        ("end", "") => SessionCommand::ResolveViolation(ViolationChoice::EndExam),
        ("fs", "on") => SessionCommand::FullscreenChanged { active: true },
        ("fs", "off") => SessionCommand::FullscreenChanged { active: false },
        ("q" | "quit" | "leave", "") => SessionCommand::Leave,
        (number, "") => match one_based(number) {
            Some(option) => SessionCommand::Select(option),
            None => return Input::Unknown(line.to_owned()),
        },
        _ => return Input::Unknown(line.to_owned()),
    };
    Input::Command(command)
}

fn one_based(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok()?.checked_sub(1)
}
