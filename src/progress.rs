//! Hierarchical progress reporting.
//!
//! A scope is one task with a known total. Child scopes borrow their parent, so a
//! nested task can never outlive the dimension it belongs to, and dropping a scope
//! tears its task down.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub trait ProgressScope {
    fn advance(&self, delta: u64);

    fn child<'a>(&'a self, label: &str, total: u64) -> Box<dyn ProgressScope + 'a>;
}

pub trait Progress {
    fn root<'a>(&'a self, label: &str, total: u64) -> Box<dyn ProgressScope + 'a>;
}

/// Terminal progress bars, one line per open scope.
pub struct BarProgress {
    multi: MultiProgress,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn root<'a>(&'a self, label: &str, total: u64) -> Box<dyn ProgressScope + 'a> {
        Box::new(BarScope::open(&self.multi, label, total, 0))
    }
}

struct BarScope<'a> {
    multi: &'a MultiProgress,
    bar: ProgressBar,
    depth: usize,
}

impl<'a> BarScope<'a> {
    fn open(multi: &'a MultiProgress, label: &str, total: u64, depth: usize) -> Self {
        let bar = multi.add(ProgressBar::new(total));
        let template = "{prefix}{msg:<28} {bar:40.cyan/blue} {pos}/{len} [{elapsed}]";
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_prefix("  ".repeat(depth));
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { multi, bar, depth }
    }
}

impl ProgressScope for BarScope<'_> {
    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn child<'b>(&'b self, label: &str, total: u64) -> Box<dyn ProgressScope + 'b> {
        Box::new(BarScope::open(self.multi, label, total, self.depth + 1))
    }
}

impl Drop for BarScope<'_> {
    fn drop(&mut self) {
        if self.depth == 0 {
            self.bar.finish();
        } else {
            self.bar.finish_and_clear();
            self.multi.remove(&self.bar);
        }
    }
}

/// Reports nothing. Used for `--quiet` and non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn root<'a>(&'a self, _label: &str, _total: u64) -> Box<dyn ProgressScope + 'a> {
        Box::new(SilentProgress)
    }
}

impl ProgressScope for SilentProgress {
    fn advance(&self, _delta: u64) {}

    fn child<'a>(&'a self, _label: &str, _total: u64) -> Box<dyn ProgressScope + 'a> {
        Box::new(SilentProgress)
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::cell::{Cell, RefCell};

    use super::{Progress, ProgressScope};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Add { id: usize, label: String, total: u64 },
        Update { id: usize, advance: u64 },
        Remove { id: usize },
    }

    /// Records the add/update/remove calls a task-id based tracker would receive.
    #[derive(Default)]
    pub struct RecordingProgress {
        next_id: Cell<usize>,
        pub events: RefCell<Vec<Event>>,
    }

    impl RecordingProgress {
        fn open(&self, label: &str, total: u64) -> RecordingScope<'_> {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.events.borrow_mut().push(Event::Add {
                id,
                label: label.to_string(),
                total,
            });
            RecordingScope { owner: self, id }
        }

        pub fn open_tasks(&self) -> Vec<usize> {
            let mut open = Vec::new();
            for e in self.events.borrow().iter() {
                match e {
                    Event::Add { id, .. } => open.push(*id),
                    Event::Remove { id } => open.retain(|o| o != id),
                    Event::Update { .. } => {}
                }
            }
            open
        }
    }

    impl Progress for RecordingProgress {
        fn root<'a>(&'a self, label: &str, total: u64) -> Box<dyn ProgressScope + 'a> {
            Box::new(self.open(label, total))
        }
    }

    pub struct RecordingScope<'a> {
        owner: &'a RecordingProgress,
        id: usize,
    }

    impl ProgressScope for RecordingScope<'_> {
        fn advance(&self, delta: u64) {
            self.owner.events.borrow_mut().push(Event::Update {
                id: self.id,
                advance: delta,
            });
        }

        fn child<'b>(&'b self, label: &str, total: u64) -> Box<dyn ProgressScope + 'b> {
            Box::new(self.owner.open(label, total))
        }
    }

    impl Drop for RecordingScope<'_> {
        fn drop(&mut self) {
            self.owner
                .events
                .borrow_mut()
                .push(Event::Remove { id: self.id });
        }
    }
}
