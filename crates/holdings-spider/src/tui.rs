use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Quarter-by-quarter progress: total attempted, successes and failures on separate bars.
///
/// Every bar is hidden when `tui` is off, so callers never branch on it.
pub(crate) struct Progress {
    _multi: Option<MultiProgress>,
    total: ProgressBar,
    success: ProgressBar,
    fails: ProgressBar,
}

impl Progress {
    pub(crate) fn new(len: usize, tui: bool) -> anyhow::Result<Self> {
        if !tui {
            return Ok(Self::hidden());
        }

        let multi = MultiProgress::new();

        // quarters attempted
        let total = multi.add(
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.magenta}\n \
                            {msg:>9.white} |{bar:40.white/grey}| {pos:<2} / {human_len} \
                            [Time: {elapsed}, ETA: {eta}]",
                    )?
                    .progress_chars("## "),
            ),
        );
        total.set_message("quarters");
        total.enable_steady_tick(Duration::from_millis(100));

        // quarters collected
        let success = multi.insert_after(
            &total,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.green} |{bar:40.green}| {pos:<2.green}")?
                    .progress_chars("## "),
            ),
        );
        success.set_message("collected");

        // quarters skipped
        let fails = multi.insert_after(
            &success,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.red} |{bar:40.red}| {pos:<2.red}")?
                    .progress_chars("## "),
            ),
        );
        fails.set_message("skipped");

        Ok(Self {
            _multi: Some(multi),
            total,
            success,
            fails,
        })
    }

    pub(crate) fn hidden() -> Self {
        Self {
            _multi: None,
            total: ProgressBar::hidden(),
            success: ProgressBar::hidden(),
            fails: ProgressBar::hidden(),
        }
    }

    pub(crate) fn succeed(&self) {
        self.total.inc(1);
        self.success.inc(1);
    }

    pub(crate) fn fail(&self) {
        self.total.inc(1);
        self.fails.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.total.finish_and_clear();
        self.success.finish_and_clear();
        self.fails.finish_and_clear();
    }
}
