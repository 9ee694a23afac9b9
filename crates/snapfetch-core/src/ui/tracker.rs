use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

pub trait TrackerBuilder<T: Tracker<U>, U> {
    fn build(self) -> T;
}

pub trait Tracker<Inc> {
    fn step(&self, step: Inc) -> &Self;
    fn finish(self);
}

const PB_STYLE: &str = "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} ({eta}) {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Counts finished units of a stage.
pub struct ProgressTracker {
    pb:     ProgressBar,
    finish: Option<String>,
}

impl ProgressTracker {
    /// A completion hook for [`snapfetch_fetch::Batch::on_complete`].
    pub fn hook(&self) -> impl Fn(usize) + Send + Sync + 'static {
        let pb = self.pb.clone();
        move |finished| pb.set_position(finished as u64)
    }

    pub fn position(&self) -> u64 { self.pb.position() }
}

impl Tracker<u64> for ProgressTracker {
    fn step(&self, units: u64) -> &Self {
        self.pb.inc(units);
        self
    }

    fn finish(self) {
        match self.finish {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTrackerBuilder {
    len:    Option<u64>,
    prefix: Option<String>,
    finish: Option<String>,
    hidden: bool,
}

impl ProgressTrackerBuilder {
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_finish(mut self, finish: &str) -> Self {
        self.finish = Some(finish.to_string());
        self
    }

    /// Draw nothing; positions are still tracked.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

impl TrackerBuilder<ProgressTracker, u64> for ProgressTrackerBuilder {
    fn build(self) -> ProgressTracker {
        let pb = match (self.hidden, self.len) {
            (true, len) => {
                let pb = ProgressBar::hidden();
                if let Some(len) = len {
                    pb.set_length(len);
                }
                pb
            }
            (false, Some(len)) => ProgressBar::new(len),
            (false, None) => ProgressBar::new_spinner(),
        };
        let pb = if let Some(style) = PB_TEMPLATE.as_ref() {
            pb.with_style(style.clone())
        } else {
            pb
        };

        if let Some(prefix) = self.prefix {
            pb.set_prefix(prefix);
        }
        ProgressTracker {
            pb,
            finish: self.finish,
        }
    }
}
