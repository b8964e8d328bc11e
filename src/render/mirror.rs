use crate::error::{Error, Result};

/// Lay bars out from the center: bar 0 sits on both sides of the middle and the last bar at
/// both edges. `out[n/2 - 1 - i] == out[n/2 + i]` for every `i`.
pub fn mirror_center_out(bar_heights: &[f64], out: &mut [f64]) -> Result<()> {
    let n = bar_heights.len();
    if n % 2 != 0 {
        return Err(Error::Layout(format!("mirrored layout needs an even bar count, got {}", n)));
    }
    if out.len() != n {
        return Err(Error::Layout(format!(
            "output holds {} bars, input has {}",
            out.len(),
            n
        )));
    }
    let half = n / 2;
    for (i, &height) in bar_heights[..half].iter().enumerate() {
        out[half - 1 - i] = height;
        out[half + i] = height;
    }
    Ok(())
}

pub fn mirrored(bar_heights: &[f64]) -> Result<Vec<f64>> {
    let mut out = vec![0.0; bar_heights.len()];
    mirror_center_out(bar_heights, &mut out)?;
    Ok(out)
}
