//! Best-window search under the minimum-duration constraint.
//!
//! The objective is the bad-segment fraction from the quality scorer:
//! among all contiguous runs of `need` segments, the one with the fewest
//! flagged segments wins, earliest start on ties. Scoring against model
//! confidence instead would couple selection to the classifier; the
//! quality objective keeps it a pure signal-side decision.

use crate::error::EegError;
use crate::types::SelectedWindow;

/// Picks the analysis window over `flags` (one entry per segment, `true` =
/// bad).
///
/// With fewer than `need` segments available this is a hard
/// [`EegError::InsufficientDuration`] when `enforce` is set; otherwise the
/// whole sequence becomes the window.
pub fn select_window(
    flags: &[bool],
    need: usize,
    enforce: bool,
) -> Result<SelectedWindow, EegError> {
    let n = flags.len();
    if n == 0 {
        return Err(EegError::invalid_input(
            "no segments could be formed from the recording",
        ));
    }
    if n < need {
        if enforce {
            return Err(EegError::InsufficientDuration { need, got: n });
        }
        return Ok(SelectedWindow {
            start: 0,
            use_count: n,
        });
    }

    // Prefix sums make each candidate window O(1).
    let mut prefix = vec![0usize; n + 1];
    for (i, &bad) in flags.iter().enumerate() {
        prefix[i + 1] = prefix[i] + usize::from(bad);
    }

    let mut best_start = 0usize;
    let mut best_bad = usize::MAX;
    for start in 0..=(n - need) {
        let bad = prefix[start + need] - prefix[start];
        if bad < best_bad {
            best_bad = bad;
            best_start = start;
        }
    }

    Ok(SelectedWindow {
        start: best_start,
        use_count: need,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sequence_fails_when_enforced() {
        let flags = vec![false; 39];
        let err = select_window(&flags, 47, true).expect_err("must fail");
        match err {
            EegError::InsufficientDuration { need, got } => {
                assert_eq!(need, 47);
                assert_eq!(got, 39);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_sequence_uses_everything_when_waived() {
        let flags = vec![false; 39];
        let window = select_window(&flags, 47, false).expect("waived");
        assert_eq!(
            window,
            SelectedWindow {
                start: 0,
                use_count: 39
            }
        );
    }

    #[test]
    fn cleanest_run_wins() {
        // Bad segments up front; the clean tail should be selected.
        let mut flags = vec![false; 12];
        flags[0] = true;
        flags[1] = true;
        flags[2] = true;
        let window = select_window(&flags, 8, true).expect("selectable");
        assert_eq!(window.start, 3);
        assert_eq!(window.use_count, 8);
    }

    #[test]
    fn ties_break_to_the_earliest_start() {
        let flags = vec![false; 60];
        let window = select_window(&flags, 47, true).expect("selectable");
        assert_eq!(window.start, 0);
    }

    #[test]
    fn empty_sequence_is_invalid_input() {
        let err = select_window(&[], 47, false).expect_err("must fail");
        assert!(matches!(err, EegError::InvalidInput { .. }));
    }
}
