use std::fmt::Write as _;

use services::sessions::{SessionPhase, SessionWarning, TimeRemaining};
use services::{LeaderboardEntry, SessionMode, SessionNotice, SessionSnapshot, SubmitTrigger};

/// Text to print for `notice`, if any.
#[must_use]
pub fn notice(notice: &SessionNotice) -> Option<String> {
    match notice {
        SessionNotice::Opened { restored: true } => Some("Resuming your saved progress.".into()),
        SessionNotice::Opened { restored: false } => None,
        SessionNotice::State(snapshot) => state(snapshot),
        SessionNotice::Countdown(left) => {
            countdown_worth_showing(*left).then(|| format!("  {} left", clock(u64::from(*left))))
        }
        SessionNotice::Warning(SessionWarning::UnansweredQuestions { count }) => Some(format!(
            "{count} question(s) unanswered. Type `submit!` to submit anyway."
        )),
        SessionNotice::ViolationRaised => Some(
            "You left fullscreen. Type `return` to continue or `end` to finish the exam now."
                .into(),
        ),
        SessionNotice::FullscreenUnavailable(reason) => Some(format!(
            "Fullscreen unavailable ({reason}); the exam continues without it."
        )),
        SessionNotice::Submitted(report) => {
            let how = match report.trigger {
                SubmitTrigger::Learner | SubmitTrigger::LearnerConfirmed => "Submitted",
                SubmitTrigger::Timeout => "Time is up",
                SubmitTrigger::Violation => "Exam ended",
            };
            let mut out = format!(
                "{how}: {}% ({}/{} correct) in {}",
                report.score.percent,
                report.score.correct,
                report.score.total,
                clock(report.time_taken_secs)
            );
            if report.mode == SessionMode::Practice {
                out.push_str(
                    "\nType `review` to see the answers or `save <name>` to record your score.",
                );
            }
            Some(out)
        }
        SessionNotice::ResultSaved(record) => Some(format!(
            "Saved {}% for {} to the leaderboard.",
            record.score(),
            record.username()
        )),
        SessionNotice::Rejected(reason) => Some(format!("! {reason}")),
        SessionNotice::Closed => Some("Session closed.".into()),
    }
}

fn state(snapshot: &SessionSnapshot) -> Option<String> {
    match snapshot.phase {
        SessionPhase::AwaitingStart => {
            let limit = match snapshot.time_remaining {
                TimeRemaining::Seconds(secs) => format!("{} to finish", clock(u64::from(secs))),
                TimeRemaining::Untimed => "no time limit".into(),
            };
            Some(format!(
                "{}: {} questions, {limit}.\nType `start` to begin or `cancel` to go back.",
                snapshot.title, snapshot.progress.total
            ))
        }
        SessionPhase::InProgress | SessionPhase::Reviewing => Some(question(snapshot)),
        SessionPhase::Cancelled => Some("Exam cancelled.".into()),
        // The submission notice carries the score.
        SessionPhase::Submitted => None,
    }
}

fn question(snapshot: &SessionSnapshot) -> String {
    let mut out = format!(
        "\n[{}/{}] {}",
        snapshot.question_number, snapshot.progress.total, snapshot.prompt
    );
    for (i, option) in snapshot.options.iter().enumerate() {
        let marker = if snapshot.selected == Some(i) { '*' } else { ' ' };
        let verdict = match snapshot.correct_answer {
            Some(correct) if correct == i => "  (correct)",
            Some(_) if snapshot.selected == Some(i) => "  (your answer)",
            _ => "",
        };
        let _ = write!(out, "\n {marker} {}. {option}{verdict}", i + 1);
    }
    if snapshot.phase == SessionPhase::InProgress {
        let _ = write!(
            out,
            "\n  answered {}/{}",
            snapshot.progress.answered, snapshot.progress.total
        );
        if let TimeRemaining::Seconds(secs) = snapshot.time_remaining {
            let _ = write!(out, ", {} left", clock(u64::from(secs)));
        }
    }
    out
}

fn countdown_worth_showing(left: u32) -> bool {
    left % 60 == 0 || left == 30 || left <= 10
}

/// `m:ss`, or `h:mm:ss` from one hour.
#[must_use]
pub fn clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[must_use]
pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "No results yet.".into();
    }
    let mut out = format!(
        "{:>3}  {:<20} {:<28} {:>5} {:>8}  {}",
        "#", "participant", "quiz", "score", "time", "date"
    );
    for (rank, entry) in entries.iter().enumerate() {
        let _ = write!(
            out,
            "\n{:>3}  {:<20} {:<28} {:>4}% {:>8}  {}",
            rank + 1,
            entry.participant,
            entry.quiz_title,
            entry.score,
            clock(entry.time_taken_secs),
            entry.completed_at.format("%Y-%m-%d")
        );
    }
    out
}
