use std::sync::Arc;
use std::thread;
use std::time::Duration;

use stage_scheduler::prelude::*;

struct Sleeper {
    name: &'static str,
    millis: u64,
}

impl System<()> for Sleeper {
    fn name(&self) -> &str {
        self.name
    }

    fn access(&self) -> SystemAccess {
        SystemAccess::empty()
    }

    fn update(&mut self, _world: &(), _dt: f32) -> Result<()> {
        if self.millis > 0 {
            thread::sleep(Duration::from_millis(self.millis));
        }
        Ok(())
    }
}

fn tight_config() -> SchedulerConfig {
    SchedulerConfig::new()
        .with_target_frame_time_ms(1.0)
        .with_slow_system_threshold_percent(0.5)
        .with_warning_cooldown_frames(60)
}

#[test]
fn test_slow_system_warned_once_per_cooldown() {
    // 10ms threshold; only `slow` sleeps past it
    let config = SchedulerConfig::new()
        .with_target_frame_time_ms(20.0)
        .with_slow_system_threshold_percent(0.5)
        .with_warning_cooldown_frames(60);
    let tracker = Arc::new(SystemPerformanceTracker::new(&config).unwrap());
    let mut scheduler = ParallelScheduler::with_tracker(config, Arc::clone(&tracker))
        .unwrap()
        .with_system(Box::new(Sleeper {
            name: "slow",
            millis: 25,
        }))
        .unwrap()
        .with_system(Box::new(Sleeper {
            name: "fast",
            millis: 0,
        }))
        .unwrap();
    scheduler.initialize(&()).unwrap();

    for _ in 0..5 {
        scheduler.update(&(), 0.016).unwrap();
    }

    assert_eq!(tracker.warnings_emitted(), 1);
    assert_eq!(tracker.current_frame(), 5);

    let slow = tracker.get_metrics("slow").unwrap();
    assert_eq!(slow.update_count, 5);
    assert!(slow.max_update_ms >= 25.0);
    assert!(slow.average_ms() >= 25.0);
    assert!(tracker.get_metrics("fast").unwrap().max_update_ms < slow.max_update_ms);

    let report = tracker.performance_report();
    assert_eq!(report[0].system, "slow");
    assert_eq!(report.len(), 2);
}

#[test]
fn test_manual_tracking_cooldown_windows() {
    let tracker = SystemPerformanceTracker::new(&tight_config()).unwrap();

    assert!(tracker.track("physics", 5.0).unwrap().is_some());
    for _ in 0..10 {
        tracker.increment_frame();
    }
    assert!(tracker.track("physics", 5.0).unwrap().is_none());
    for _ in 0..51 {
        tracker.increment_frame();
    }
    let warning = tracker.track("physics", 5.0).unwrap().unwrap();
    assert_eq!(warning.frame, 61);
    assert_eq!(warning.budget_percent, 500.0);

    // Under threshold never warns, even outside cooldown
    assert!(tracker.track("render", 0.1).unwrap().is_none());
    assert_eq!(tracker.warnings_emitted(), 2);
}

#[test]
fn test_reset_clears_metrics_and_cooldowns() {
    let tracker = SystemPerformanceTracker::new(&tight_config()).unwrap();
    tracker.track("physics", 5.0).unwrap();
    tracker.reset_metrics();

    assert!(tracker.get_all_metrics().is_empty());
    assert_eq!(tracker.get_metrics("physics").unwrap().update_count, 0);
    assert!(tracker.track("physics", 5.0).unwrap().is_some());
}

#[test]
fn test_empty_name_rejected() {
    let tracker = SystemPerformanceTracker::default();
    assert!(matches!(
        tracker.track("", 1.0),
        Err(SchedulerError::InvalidArgument(_))
    ));
    assert!(matches!(
        tracker.get_metrics("  "),
        Err(SchedulerError::InvalidArgument(_))
    ));
}

#[test]
fn test_zero_budget_rejected() {
    let config = SchedulerConfig::new().with_target_frame_time_ms(0.0);
    assert!(matches!(
        SystemPerformanceTracker::new(&config),
        Err(SchedulerError::Config(_))
    ));
}
