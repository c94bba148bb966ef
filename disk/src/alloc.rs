//! Free-range computation and fit-based selection.

use crate::mbr::{Fit, Mbr, MBR_RESERVED};

/// A free byte range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub start: i64,
    pub end: i64,
}

impl Segment {
    pub fn size(&self) -> i64 {
        self.end - self.start
    }
}

/// Returns the free segments of the disk, excluding the MBR area and every
/// used primary/extended region, ordered by start offset.
pub(crate) fn free_primary_segments(mbr: &Mbr) -> Vec<Segment> {
    let mut used: Vec<Segment> = mbr
        .parts
        .iter()
        .filter(|p| p.is_used())
        .map(|p| Segment {
            start: p.start,
            end: p.end(),
        })
        .collect();
    used.sort_by_key(|s| s.start);

    let mut free = Vec::new();
    let mut cur = MBR_RESERVED;
    for seg in used {
        if seg.start > cur {
            free.push(Segment {
                start: cur,
                end: seg.start,
            });
        }
        cur = cur.max(seg.end);
    }
    if cur < mbr.size_bytes {
        free.push(Segment {
            start: cur,
            end: mbr.size_bytes,
        });
    }
    free
}

/// Picks a segment of at least `need` bytes according to `fit`.
///
/// Ties are broken by the earliest start offset; `segments` must already be
/// ordered by start.
pub(crate) fn pick_by_fit(segments: &[Segment], need: i64, fit: Fit) -> Option<Segment> {
    let mut chosen: Option<Segment> = None;
    for seg in segments.iter().filter(|s| s.size() >= need) {
        match fit {
            Fit::First => return Some(*seg),
            Fit::Best => {
                if chosen.map_or(true, |c| seg.size() < c.size()) {
                    chosen = Some(*seg);
                }
            }
            Fit::Worst => {
                if chosen.map_or(true, |c| seg.size() > c.size()) {
                    chosen = Some(*seg);
                }
            }
        }
    }
    chosen
}

#[cfg(test)]
mod test {
    use super::*;

    fn seg(start: i64, end: i64) -> Segment {
        Segment { start, end }
    }

    #[test]
    fn fit_selection() {
        let free = [seg(512, 1024), seg(4096, 8192), seg(16384, 18432)];

        assert_eq!(pick_by_fit(&free, 400, Fit::First), Some(seg(512, 1024)));
        assert_eq!(pick_by_fit(&free, 400, Fit::Best), Some(seg(512, 1024)));
        assert_eq!(pick_by_fit(&free, 400, Fit::Worst), Some(seg(4096, 8192)));
        assert_eq!(pick_by_fit(&free, 2048, Fit::First), Some(seg(4096, 8192)));
        assert_eq!(pick_by_fit(&free, 2048, Fit::Best), Some(seg(16384, 18432)));
        assert_eq!(pick_by_fit(&free, 5000, Fit::Best), None);
    }

    #[test]
    fn ties_break_earliest() {
        let free = [seg(512, 1024), seg(2048, 2560)];
        // Both segments have the same size; every fit picks the first.
        for fit in [Fit::First, Fit::Best, Fit::Worst] {
            assert_eq!(pick_by_fit(&free, 100, fit), Some(seg(512, 1024)));
        }
    }

    #[test]
    fn free_segments_between_partitions() {
        let mut mbr = Mbr::new(30 * 1024 * 1024, Fit::Best, 1, 0);
        mbr.parts[0].status = crate::mbr::STATUS_USED;
        mbr.parts[0].ptype = b'P';
        mbr.parts[0].start = 512;
        mbr.parts[0].size = 10 * 1024 * 1024;
        mbr.parts[1].status = crate::mbr::STATUS_USED;
        mbr.parts[1].ptype = b'P';
        mbr.parts[1].start = 512 + 10 * 1024 * 1024;
        mbr.parts[1].size = 5 * 1024 * 1024;

        let free = free_primary_segments(&mbr);
        assert_eq!(
            free,
            vec![seg(512 + 15 * 1024 * 1024, 30 * 1024 * 1024)]
        );
    }
}
