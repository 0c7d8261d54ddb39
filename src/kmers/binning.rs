/// How raw coverage values are compressed into coverage bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverageScale {
    /// `bin = coverage × factor`
    Linear(f64),
    /// `bin = log10(coverage + 1) × factor`
    Log10(f64),
}

impl CoverageScale {
    /// Scale used for per-sequence coverage (`sect`): linear by 0.1, or
    /// log-scaled by 100 so that coverage 10^k lands around bin 100k.
    pub fn for_sequences(log_scale: bool) -> Self {
        if log_scale {
            CoverageScale::Log10(100.0)
        } else {
            CoverageScale::Linear(0.1)
        }
    }

    #[inline]
    pub fn apply(&self, coverage: f64) -> f64 {
        match *self {
            CoverageScale::Linear(factor) => coverage * factor,
            CoverageScale::Log10(factor) => (coverage + 1.0).log10() * factor,
        }
    }
}

/// Clamp a bin index into `0..bins`.
#[inline]
pub fn clamp_bin(bin: usize, bins: usize) -> usize {
    bin.min(bins.saturating_sub(1))
}

/// Bin a coverage value; values beyond the range land in the last bin.
#[inline]
pub fn coverage_bin(coverage: f64, scale: CoverageScale, bins: usize) -> usize {
    let scaled = scale.apply(coverage);
    if scaled.is_nan() || scaled <= 0.0 {
        return 0;
    }
    // `as` saturates for floats larger than usize::MAX
    clamp_bin(scaled as usize, bins)
}

/// Bin a fraction in `[0, 1]` into `bins` equal-width bins.
#[inline]
pub fn fraction_bin(fraction: f64, bins: usize) -> usize {
    let f = fraction.clamp(0.0, 1.0);
    clamp_bin((f * (bins.saturating_sub(1)) as f64).round() as usize, bins)
}
