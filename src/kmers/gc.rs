/// Count G/C bases and all unambiguous (A/C/G/T) bases of `seq`.
pub fn gc_counts(seq: &[u8]) -> (u64, u64) {
    let mut gc = 0u64;
    let mut acgt = 0u64;
    for &b in seq {
        match b {
            b'G' | b'g' | b'C' | b'c' => {
                gc += 1;
                acgt += 1;
            }
            b'A' | b'a' | b'T' | b't' => acgt += 1,
            _ => {}
        }
    }
    (gc, acgt)
}

/// GC fraction over the unambiguous bases; `None` when there are none.
pub fn gc_fraction(seq: &[u8]) -> Option<f64> {
    let (gc, acgt) = gc_counts(seq);
    if acgt == 0 {
        None
    } else {
        Some(gc as f64 / acgt as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_bases_are_ignored() {
        assert_eq!(gc_counts(b"ACGTNN"), (2, 4));
        assert_eq!(gc_fraction(b"GGNN"), Some(1.0));
        assert_eq!(gc_fraction(b"NNNN"), None);
    }
}
