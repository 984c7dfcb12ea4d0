use std::time::{Duration, Instant};

/// Viewport width at which the layout switches to the medium tier.
pub const MEDIUM_MIN_WIDTH: f32 = 768.0;
/// Viewport width at which the layout switches to the wide tier.
pub const WIDE_MIN_WIDTH: f32 = 1280.0;

/// Responsive layout bucket derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayoutTier {
    Compact,
    Medium,
    Wide,
}

impl LayoutTier {
    pub const ALL: [LayoutTier; 3] = [LayoutTier::Compact, LayoutTier::Medium, LayoutTier::Wide];

    /// Total number of grid columns available in this tier.
    pub fn columns(&self) -> u8 {
        match self {
            LayoutTier::Compact => 4,
            LayoutTier::Medium => 8,
            LayoutTier::Wide => 12,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayoutTier::Compact => "compact",
            LayoutTier::Medium => "medium",
            LayoutTier::Wide => "wide",
        }
    }
}

impl std::fmt::Display for LayoutTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a viewport width to its layout tier.
///
/// Total over every `f32`: negative widths and `NaN` resolve to `Compact`.
pub fn resolve(viewport_width: f32) -> LayoutTier {
    match viewport_width {
        w if w >= WIDE_MIN_WIDTH => LayoutTier::Wide,
        w if w >= MEDIUM_MIN_WIDTH => LayoutTier::Medium,
        _ => LayoutTier::Compact,
    }
}

/// Tracks the current tier across resize signals.
///
/// Resolution is throttled: widths observed less than `min_interval` after the
/// last applied one are held as pending and applied by the next `observe` or
/// `flush` once the interval has elapsed, so the final width of a resize burst
/// is never lost.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    tier: LayoutTier,
    width: f32,
    pending: Option<f32>,
    last_applied: Option<Instant>,
    min_interval: Duration,
}

impl ViewportTracker {
    pub fn new(width: f32, min_interval: Duration) -> Self {
        Self {
            tier: resolve(width),
            width,
            pending: None,
            last_applied: None,
            min_interval,
        }
    }

    pub fn tier(&self) -> LayoutTier {
        self.tier
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a resize signal. Returns the new tier when it changed.
    pub fn observe(&mut self, width: f32, now: Instant) -> Option<LayoutTier> {
        if self.pending.is_none() && width == self.width {
            return None;
        }
        self.pending = Some(width);
        self.flush(now)
    }

    /// Apply a pending width if the throttle interval has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<LayoutTier> {
        let width = self.pending?;
        if let Some(last) = self.last_applied {
            if now.saturating_duration_since(last) < self.min_interval {
                return None;
            }
        }
        self.pending = None;
        self.last_applied = Some(now);
        self.apply(width)
    }

    fn apply(&mut self, width: f32) -> Option<LayoutTier> {
        let next = resolve(width);
        if self.width != width {
            tracing::trace!(old_width = self.width, new_width = width, "layout.resize");
        }
        self.width = width;
        if next == self.tier {
            return None;
        }
        tracing::debug!(from = self.tier.name(), to = next.name(), "layout.breakpoint_change");
        self.tier = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        assert_eq!(resolve(0.0), LayoutTier::Compact);
        assert_eq!(resolve(767.9), LayoutTier::Compact);
        assert_eq!(resolve(768.0), LayoutTier::Medium);
        assert_eq!(resolve(1279.0), LayoutTier::Medium);
        assert_eq!(resolve(1280.0), LayoutTier::Wide);
        assert_eq!(resolve(4000.0), LayoutTier::Wide);
    }

    #[test]
    fn degenerate_widths_are_compact() {
        assert_eq!(resolve(-10.0), LayoutTier::Compact);
        assert_eq!(resolve(f32::NAN), LayoutTier::Compact);
    }

    #[test]
    fn column_counts() {
        assert_eq!(LayoutTier::Compact.columns(), 4);
        assert_eq!(LayoutTier::Medium.columns(), 8);
        assert_eq!(LayoutTier::Wide.columns(), 12);
    }

    #[test]
    fn tracker_reports_only_tier_changes() {
        let start = Instant::now();
        let mut tracker = ViewportTracker::new(1300.0, Duration::ZERO);
        assert_eq!(tracker.tier(), LayoutTier::Wide);
        assert_eq!(tracker.observe(1290.0, start), None);
        assert_eq!(tracker.observe(900.0, start), Some(LayoutTier::Medium));
        assert_eq!(tracker.observe(900.0, start), None);
        assert_eq!(tracker.width(), 900.0);
    }

    #[test]
    fn tracker_throttles_and_keeps_trailing_width() {
        let start = Instant::now();
        let frame = Duration::from_millis(16);
        let mut tracker = ViewportTracker::new(1300.0, frame);

        assert_eq!(tracker.observe(1000.0, start), Some(LayoutTier::Medium));
        // Within the same frame: held back.
        assert_eq!(tracker.observe(500.0, start + Duration::from_millis(4)), None);
        assert!(tracker.has_pending());
        assert_eq!(tracker.tier(), LayoutTier::Medium);

        assert_eq!(tracker.flush(start + frame), Some(LayoutTier::Compact));
        assert!(!tracker.has_pending());
        assert_eq!(tracker.width(), 500.0);
    }
}
