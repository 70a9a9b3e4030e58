//! Loop pacing shared by the sync engine and the terminal front-end

use std::time::{Duration, Instant};

/// Sleep out whatever is left of `frame` since `frame_start`.
///
/// Call at the end of each loop iteration so the loop runs at a steady rate no matter
/// how long the work inside took.
///
/// # Example
/// ```rust,no_run
/// use std::time::{Duration, Instant};
/// # use bomberduel::timing::limit_frame_rate;
/// let frame_start = Instant::now();
/// // ... loop body ...
/// limit_frame_rate(frame_start, Duration::from_millis(50));
/// ```
pub fn limit_frame_rate(frame_start: Instant, frame: Duration) {
    let elapsed = frame_start.elapsed();
    if elapsed < frame {
        std::thread::sleep(frame - elapsed);
    }
}
