//! OHLC binner - buckets a rate series into fixed-width bars.

use crate::types::OhlcBar;

/// Bucket `(timestamp, rate)` points into `frame_secs`-wide bars.
///
/// Single forward pass over an already-ordered sequence; composes
/// directly on [`crate::rates::resolve`]. A bar is emitted when its frame
/// ends and the final open bar is emitted once the input is exhausted.
pub fn bin<I>(points: I, frame_secs: u64) -> OhlcIter<I::IntoIter>
where
    I: IntoIterator<Item = (u64, f64)>,
{
    OhlcIter {
        points: points.into_iter(),
        // A zero frame would collapse every point into one index.
        frame_secs: frame_secs.max(1),
        open: None,
    }
}

pub struct OhlcIter<I> {
    points: I,
    frame_secs: u64,
    /// Bar under construction. `None` doubles as the has-data flag: frame
    /// index 0 is a legitimate frame, so it can never serve as a sentinel.
    open: Option<OpenBar>,
}

struct OpenBar {
    frame: u64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl OpenBar {
    fn new(frame: u64, price: f64) -> Self {
        Self {
            frame,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    fn update(&mut self, price: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
    }

    fn finish(self, frame_secs: u64) -> OhlcBar {
        OhlcBar {
            frame_start: self.frame * frame_secs,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }
}

impl<I: Iterator<Item = (u64, f64)>> Iterator for OhlcIter<I> {
    type Item = OhlcBar;

    fn next(&mut self) -> Option<OhlcBar> {
        loop {
            let Some((ts, price)) = self.points.next() else {
                return self.open.take().map(|bar| bar.finish(self.frame_secs));
            };
            let frame = ts / self.frame_secs;
            match &mut self.open {
                Some(bar) if bar.frame == frame => bar.update(price),
                Some(_) => {
                    let done = self.open.replace(OpenBar::new(frame, price));
                    return done.map(|bar| bar.finish(self.frame_secs));
                }
                None => self.open = Some(OpenBar::new(frame, price)),
            }
        }
    }
}
