use crate::experience::FlushReport;
use crate::infra::RunObserver;
use crate::stats::StatsReport;

/// Observer that reports run events through `tracing`
pub struct DefaultObserver;

impl DefaultObserver {
    fn log_report(report: &StatsReport) {
        tracing::info!("Total Time: {:.3}s", report.elapsed.as_secs_f64());
        tracing::info!("Total Frames: {}", report.total_frames);
        tracing::info!("Average FPS: {:.2}", report.fps);
        tracing::info!("Fraction Skipped: {:.6}", report.skip_fraction);
        tracing::info!(
            "Average Thinking Time: {:.3}ms ({:.2}% of frame budget)",
            report.avg_thinking_ms,
            report.thinking_fraction * 100.0
        );
    }
}

impl RunObserver for DefaultObserver {
    fn on_run_start(&mut self, locations: usize, participants: usize) {
        tracing::info!(
            "Starting run loop: {} watched locations, {} participant(s)",
            locations,
            participants
        );
    }

    fn on_frames_skipped(&mut self, frame: u32, skipped: u32) {
        tracing::debug!("Skipped {} frame(s) before frame {}", skipped, frame);
    }

    fn on_frame_regressed(&mut self, from: u32, to: u32) {
        tracing::warn!("Frame counter went backwards: {} -> {}", from, to);
    }

    fn on_unrecognized_menu(&mut self, raw: i32) {
        tracing::warn!("Weird menu state {}", raw);
    }

    fn on_navigation_complete(&mut self) {
        tracing::info!("Menu navigation complete, playing settings macro");
    }

    fn on_flush(&mut self, report: &FlushReport) {
        tracing::info!(
            "Dumped {} records to {} (mean reward {:.4})",
            report.records,
            report.path.display(),
            report.mean_reward
        );
    }

    fn on_stats(&mut self, report: &StatsReport) {
        Self::log_report(report);
    }

    fn on_run_finished(&mut self, report: &StatsReport) {
        tracing::info!("Run finished");
        Self::log_report(report);
    }
}
