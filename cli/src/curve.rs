//! Curve tabulation

use anyhow::Result;
use colored::Colorize;
use pamm_model::curve::curve_shape;
use pamm_model::region::classify_anchor;
use pamm_model::{compute_price, compute_reserve, Fp, Region};

use crate::config::CliConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint {
    pub x: Fp,
    pub reserve: Fp,
    pub price: Fp,
    pub region: Region,
}

/// Upper bound on `--steps`
pub const MAX_STEPS: u32 = 10_000;

/// `steps + 1` evenly spaced points over `x in [0, y_a]`
pub fn curve_points(config: &CliConfig, ba: Fp, ya: Fp, steps: u32) -> Result<Vec<CurvePoint>> {
    if steps == 0 || steps > MAX_STEPS {
        anyhow::bail!("--steps must lie in 1..={MAX_STEPS}, got {steps}");
    }
    let params = &config.params;
    let divisor = Fp::from_integer(i64::from(steps));
    (0..=steps)
        .map(|i| -> Result<CurvePoint> {
            let x = if i == steps {
                ya
            } else {
                ya.mul_down(Fp::from_integer(i64::from(i)))?.div_down(divisor)?
            };
            Ok(CurvePoint {
                x,
                reserve: compute_reserve(x, ba, ya, params)?,
                price: compute_price(x, ba, ya, params)?,
                region: classify_anchor(x, ba, ya, params, config.region_tolerance)?,
            })
        })
        .collect()
}

pub fn show_curve(config: &CliConfig, ba: Fp, ya: Fp, steps: u32) -> Result<()> {
    let points = curve_points(config, ba, ya, steps)?;

    println!("{}", "=== Redemption Curve ===".bright_green().bold());
    println!("{} {}", "Anchor reserve:".bright_cyan(), ba);
    println!("{} {}", "Anchor supply:".bright_cyan(), ya);
    if let Some(shape) = curve_shape(ba, ya, &config.params)? {
        println!("{} {}", "Decay slope:".bright_cyan(), shape.alpha);
        println!("{} {}", "Upper threshold:".bright_cyan(), shape.xu);
        println!("{} {}", "Lower threshold:".bright_cyan(), shape.xl);
    }

    println!(
        "\n{:>24} {:>24} {:>24}  {}",
        "x".bold(),
        "reserve".bold(),
        "price".bold(),
        "region".bold()
    );
    for point in &points {
        println!(
            "{:>24} {:>24} {:>24}  {}",
            point.x.to_string(),
            point.reserve.to_string(),
            point.price.to_string(),
            point.region
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fp {
        s.parse().unwrap()
    }

    #[test]
    fn test_points_cover_the_anchor_supply() {
        let config = CliConfig::new(None).unwrap();
        let points = curve_points(&config, fp("0.85"), Fp::one(), 10).unwrap();
        assert_eq!(points.len(), 11);
        assert_eq!(points[0].x, Fp::zero());
        assert_eq!(points[0].reserve, fp("0.85"));
        assert_eq!(points[0].price, Fp::one());
        assert_eq!(points[4].x, fp("0.4"));
        assert_eq!(points[4].reserve, fp("0.455"));
        assert_eq!(points[10].x, Fp::one());

        for pair in points.windows(2) {
            assert!(pair[1].reserve <= pair[0].reserve);
            assert!(pair[1].price <= pair[0].price);
        }
    }

    #[test]
    fn test_flat_curve_and_bad_steps() {
        let config = CliConfig::new(None).unwrap();
        let points = curve_points(&config, fp("1.2"), Fp::one(), 4).unwrap();
        assert!(points.iter().all(|p| p.price == Fp::one() && p.region == Region::High));
        assert_eq!(points[4].reserve, fp("0.2"));

        assert!(curve_points(&config, fp("0.85"), Fp::one(), 0).is_err());
        assert!(curve_points(&config, fp("0.85"), Fp::one(), MAX_STEPS + 1).is_err());
        show_curve(&config, fp("0.85"), Fp::one(), 5).unwrap();
    }
}
