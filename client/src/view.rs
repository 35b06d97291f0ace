use sync_core::{AnswerOutcome, LocalQuestion};

const BAR_WIDTH: usize = 20;

/// Everything a session shows to the person at the terminal.
pub trait View {
    fn question(&mut self, question: &LocalQuestion);
    fn timer(&mut self, remaining: i64, fill_percent: f64);
    fn answers_count(&mut self, count: u32);
    /// Shown in place of the timer while the server moves between questions.
    fn transition(&mut self);
    fn time_up(&mut self);
    fn answer_result(&mut self, outcome: &AnswerOutcome);
    fn submission_failed(&mut self, reason: &str);
}

#[derive(Debug, Default)]
pub struct TerminalView {
    last_count: Option<u32>,
    in_transition: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bar(fill_percent: f64) -> String {
    let filled = ((fill_percent / 100.0) * BAR_WIDTH as f64).round();
    let filled = (filled.max(0.0) as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

impl View for TerminalView {
    fn question(&mut self, question: &LocalQuestion) {
        self.in_transition = false;
        self.last_count = None;
        match &question.text {
            Some(text) => println!("Question {}: {text}", question.id),
            None => println!("Question {}", question.id),
        }
        println!("Time limit: {}s", question.time_limit());
    }

    fn timer(&mut self, remaining: i64, fill_percent: f64) {
        self.in_transition = false;
        println!("{} {remaining}s", bar(fill_percent));
    }

    fn answers_count(&mut self, count: u32) {
        if self.last_count != Some(count) {
            println!("Answers received: {count}");
            self.last_count = Some(count);
        }
    }

    fn transition(&mut self) {
        if !self.in_transition {
            println!("Waiting for the next question...");
            self.in_transition = true;
        }
    }

    fn time_up(&mut self) {
        println!("Time is up.");
    }

    fn answer_result(&mut self, outcome: &AnswerOutcome) {
        if outcome.correct {
            println!(
                "Correct! +{} points (total: {})",
                outcome.points, outcome.total_score
            );
        } else {
            println!("Incorrect. 0 points (total: {})", outcome.total_score);
        }
    }

    fn submission_failed(&mut self, reason: &str) {
        println!("Submission failed: {reason}. Wait for the next question...");
    }
}
