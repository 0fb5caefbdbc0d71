use crate::experience::FlushReport;
use crate::planners::ActionId;
use crate::stats::StatsReport;

/// Trait for observing control-loop events during a run
pub trait RunObserver {
    /// Called once before the first poll
    fn on_run_start(&mut self, locations: usize, participants: usize);

    /// Called when the frame counter jumped by more than one
    fn on_frames_skipped(&mut self, frame: u32, skipped: u32);

    /// Called when the frame counter went backwards
    fn on_frame_regressed(&mut self, from: u32, to: u32);

    /// Called when the menu location holds a value the loop does not know
    fn on_unrecognized_menu(&mut self, raw: i32);

    /// Called after every decimated dispatch, with one action per agent
    fn on_dispatch(&mut self, _frame: u32, _actions: &[ActionId]) {
        // Default implementation does nothing
    }

    /// Called once when every participant has reached its menu target
    fn on_navigation_complete(&mut self) {}

    /// Called when an experience window was persisted
    fn on_flush(&mut self, report: &FlushReport);

    /// Called periodically during a match
    fn on_stats(&mut self, report: &StatsReport);

    /// Called when the run ends, cleanly or not
    fn on_run_finished(&mut self, report: &StatsReport);
}
