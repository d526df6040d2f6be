//! Terminal front-end
//!
//! Each question races a line of input against a countdown and an interrupt
//! future; whichever resolves first decides the answer.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::time::Instant;

use wordcat_algo::SessionRecord;

use crate::error::EngineResult;
use crate::session::{
    Advance, AnswerFeedback, AnswerResult, PracticeController, Question, SessionController,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Index(usize),
    Quit,
    Invalid,
}

/// Parses a 1-based option number or a quit command.
pub fn parse_choice(line: &str, option_count: usize) -> Choice {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
        return Choice::Quit;
    }
    match trimmed.parse::<usize>() {
        Ok(n) if (1..=option_count).contains(&n) => Choice::Index(n - 1),
        _ => Choice::Invalid,
    }
}

pub fn render_question(question: &Question, header: &str, seconds: u64) -> String {
    let mut text = format!(
        "\n[{}] {}  <{}>  ({}s)\n",
        header,
        question.prompt,
        question.category.as_str(),
        seconds
    );
    for (i, option) in question.options.iter().enumerate() {
        text.push_str(&format!("  {}) {}\n", i + 1, option));
    }
    text
}

pub fn render_feedback(feedback: &AnswerFeedback) -> String {
    let verdict = match (feedback.selected, feedback.is_correct) {
        (_, true) => "correct".to_string(),
        (None, false) => format!("time's up, answer: {}", feedback.correct_text),
        (Some(_), false) => format!("wrong, answer: {}", feedback.correct_text),
    };
    match feedback.delta_theta {
        Some(delta) => format!("{verdict}  (θ {delta:+.3})"),
        None => verdict,
    }
}

pub fn render_summary(record: &SessionRecord) -> String {
    format!(
        "\nscore {}/{}\nθ {:.3} -> {:.3}\npass probability {:.1}% -> {:.1}%\nmastered {} -> {}",
        record.score,
        record.total,
        record.theta_before,
        record.theta_after,
        record.pass_probability_before * 100.0,
        record.pass_probability_after * 100.0,
        record.mastered_before,
        record.mastered_after,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(SessionRecord),
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PracticeSummary {
    pub answered: u32,
    pub correct: u32,
}

enum Reply {
    Choice(usize),
    TimedOut,
    Quit,
}

async fn read_reply<R, W, F>(
    lines: &mut Lines<R>,
    out: &mut W,
    option_count: usize,
    deadline: Instant,
    interrupt: &mut Pin<&mut F>,
) -> EngineResult<Reply>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(Reply::Quit);
                };
                match parse_choice(&line, option_count) {
                    Choice::Index(index) => return Ok(Reply::Choice(index)),
                    Choice::Quit => return Ok(Reply::Quit),
                    Choice::Invalid => {
                        write!(out, "enter 1-{option_count} or q: ")?;
                        out.flush()?;
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline) => return Ok(Reply::TimedOut),
            _ = interrupt.as_mut() => return Ok(Reply::Quit),
        }
    }
}

/// Runs one assessment to completion or until the user quits.
pub async fn run_assessment<R, W, F>(
    session: &mut SessionController,
    input: R,
    out: &mut W,
    question_time: Duration,
    interrupt: F,
) -> EngineResult<RunOutcome>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut lines = input.lines();

    session.start()?;

    while let Some(question) = session.current_question().cloned() {
        write!(
            out,
            "{}",
            render_question(
                &question,
                &format!(
                    "{} {}/{}",
                    session.phase().as_str(),
                    session.question_number(),
                    session.queue_len()
                ),
                question_time.as_secs()
            )
        )?;
        out.flush()?;

        let deadline = Instant::now() + question_time;
        let result = match read_reply(
            &mut lines,
            out,
            question.options.len(),
            deadline,
            &mut interrupt,
        )
        .await?
        {
            Reply::Choice(index) => session.select_answer(index)?,
            Reply::TimedOut => session.time_up()?,
            Reply::Quit => {
                tracing::info!(
                    grade = session.grade(),
                    answered = session.question_number(),
                    "assessment interrupted"
                );
                return Ok(RunOutcome::Interrupted);
            }
        };

        if let AnswerResult::Answered(feedback) = result {
            writeln!(out, "{}", render_feedback(&feedback))?;
        }

        match session.advance()? {
            Advance::ReviewStarted => {
                writeln!(
                    out,
                    "\n-- review of {} missed words --",
                    session.queue_len()
                )?;
            }
            Advance::Next | Advance::Finished(_) => {}
            other => tracing::debug!(?other, "advance did not move the session"),
        }
    }

    match session.record() {
        Some(record) => {
            writeln!(out, "{}", render_summary(record))?;
            Ok(RunOutcome::Completed(record.clone()))
        }
        None => Ok(RunOutcome::Interrupted),
    }
}

/// Runs practice until the user quits or the grade has no items.
pub async fn run_practice<R, W, F>(
    practice: &mut PracticeController,
    input: R,
    out: &mut W,
    question_time: Duration,
    interrupt: F,
) -> EngineResult<PracticeSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut lines = input.lines();

    practice.start()?;

    while let Some(question) = practice.next_question().cloned() {
        let header = format!("practice #{}", practice.answered_count() + 1);
        write!(
            out,
            "{}",
            render_question(&question, &header, question_time.as_secs())
        )?;
        out.flush()?;

        let deadline = Instant::now() + question_time;
        let result = match read_reply(
            &mut lines,
            out,
            question.options.len(),
            deadline,
            &mut interrupt,
        )
        .await?
        {
            Reply::Choice(index) => practice.select_answer(index)?,
            Reply::TimedOut => practice.time_up()?,
            Reply::Quit => break,
        };

        if let AnswerResult::Answered(feedback) = result {
            writeln!(
                out,
                "{}  [{}/{}]",
                render_feedback(&feedback),
                practice.correct_count(),
                practice.answered_count()
            )?;
        }
    }

    let summary = PracticeSummary {
        answered: practice.answered_count(),
        correct: practice.correct_count(),
    };
    tracing::info!(
        answered = summary.answered,
        correct = summary.correct,
        theta = practice.ability().theta,
        "practice ended"
    );
    Ok(summary)
}
