//! Liveness windows.

/// Half-open source range `[start, end)` a binding is assumed valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LivenessWindow {
    /// First offset covered
    pub start: u32,
    /// First offset no longer covered
    pub end: u32,
}

impl LivenessWindow {
    /// An empty window opened at `start`.
    #[must_use]
    pub fn open(start: u32) -> Self {
        Self { start, end: start }
    }

    /// A window covering exactly `[start, end)`.
    #[must_use]
    pub fn covering(start: u32, end: u32) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Extends the window to include a use at `pos`.
    pub fn extend_to(&mut self, pos: u32) {
        self.end = self.end.max(pos.saturating_add(1));
    }

    /// Ends the window at `pos`.
    pub fn close_at(&mut self, pos: u32) {
        self.end = pos.max(self.start);
    }

    /// Whether the window spans the offset `at`.
    #[must_use]
    pub fn straddles(&self, at: u32) -> bool {
        self.start <= at && at < self.end
    }

    /// Returns `true` if the window covers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_grows_with_uses() {
        let mut window = LivenessWindow::open(10);
        assert!(window.is_empty());
        assert!(!window.straddles(10));

        window.extend_to(20);
        assert!(window.straddles(10));
        assert!(window.straddles(20));
        assert!(!window.straddles(21));
        assert!(!window.straddles(9));

        window.extend_to(15);
        assert_eq!(window.end, 21);
    }

    #[test]
    fn test_close_never_inverts() {
        let mut window = LivenessWindow::open(10);
        window.extend_to(30);
        window.close_at(25);
        assert_eq!(window, LivenessWindow::covering(10, 25));

        window.close_at(5);
        assert!(window.is_empty());
        assert_eq!(LivenessWindow::covering(8, 3), LivenessWindow::open(8));
    }
}
