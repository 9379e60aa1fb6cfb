//! Otsu thresholding for quad search and bit decoding.

/// Otsu threshold from a set of sample intensities.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    otsu_threshold_from_histogram(&hist)
}

/// Otsu threshold from a 256-bin histogram.
///
/// Pixels strictly below the returned value belong to the dark class.
/// Degenerate histograms fall back to the midpoint of the occupied range
/// (or to the single occupied value).
pub(crate) fn otsu_threshold_from_histogram(hist: &[u32; 256]) -> u8 {
    let Some(min_v) = hist.iter().position(|&h| h > 0) else {
        return 127;
    };
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(min_v);
    if min_v == max_v {
        return min_v as u8;
    }

    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v + max_v + 1) / 2) as u8;
    }

    let total: f64 = hist.iter().map(|&h| h as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            // class "dark" is `v <= t`, callers test `v < threshold`
            best_t = (t + 1).min(255) as u8;
        }
    }

    best_t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_samples_split_between_modes() {
        let mut samples = vec![20u8; 50];
        samples.extend(std::iter::repeat(25u8).take(30));
        samples.extend(std::iter::repeat(220u8).take(60));
        samples.extend(std::iter::repeat(230u8).take(40));
        let t = otsu_threshold_from_samples(&samples);
        assert!(t > 25 && t <= 220, "threshold {t}");
    }

    #[test]
    fn two_level_image_uses_midpoint() {
        let samples = [0u8, 0, 255, 255];
        let t = otsu_threshold_from_samples(&samples);
        assert!(0 < t && t <= 255);
        assert_eq!(t, 128);
    }

    #[test]
    fn flat_samples_return_their_value() {
        assert_eq!(otsu_threshold_from_samples(&[77u8; 10]), 77);
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
    }
}
