//! Terminal rendering of install events.

use std::collections::HashMap;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use launchkit::manager::{InstallEvent, InstallStage};

const BAR_TEMPLATE: &str = "  {prefix:<24} [{bar:40.cyan/blue}] {pos:>3}%";
const STAGE_TEMPLATE: &str = "{spinner:.green} {msg}";

/// One bar per asset plus a spinner naming the current stage.
pub struct ProgressView {
    multi: MultiProgress,
    stage: ProgressBar,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressView {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        let stage = multi.add(ProgressBar::new_spinner());
        stage.set_style(
            ProgressStyle::default_spinner()
                .template(STAGE_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        stage.enable_steady_tick(Duration::from_millis(120));

        Self {
            multi,
            stage,
            bars: HashMap::new(),
        }
    }

    pub fn handle(&mut self, event: InstallEvent) {
        match event {
            InstallEvent::Stage(stage) => self.on_stage(stage),
            InstallEvent::Log(line) => self.print(&line),
            InstallEvent::Progress { asset, percent } => self.on_progress(&asset, percent),
        }
    }

    pub fn finish(&self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
        self.stage.finish_and_clear();
    }

    fn on_stage(&self, stage: InstallStage) {
        self.stage.set_message(style(stage.name()).bold().to_string());
    }

    fn on_progress(&mut self, asset: &str, percent: u8) {
        let bar = match self.bars.get(asset) {
            Some(bar) => bar.clone(),
            None => {
                let bar = self.asset_bar(asset);
                self.bars.insert(asset.to_string(), bar.clone());
                bar
            }
        };

        bar.set_position(u64::from(percent.min(100)));
        if percent >= 100 {
            bar.finish();
        }
    }

    fn asset_bar(&self, asset: &str) -> ProgressBar {
        let bar = self.multi.insert_before(&self.stage, ProgressBar::new(100));
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_prefix(asset.to_string());
        bar
    }

    /// Print a line above the bars. Falls back to stdout when not a terminal.
    fn print(&self, line: &str) {
        if self.multi.is_hidden() {
            println!("{}", line);
        } else {
            let _ = self.multi.println(line);
        }
    }
}

impl Default for ProgressView {
    fn default() -> Self {
        Self::new()
    }
}
