use tracing::{info, warn};

use crate::error::{EmergyError, Result};
use crate::formatting::{parse_scientific, round_to};
use crate::models::{
    EmergyTotals, SustainabilityClassification, SustainabilityIndicators, NONRENEWABLE, PURCHASED,
    RENEWABLE,
};

// ── Thresholds ────────────────────────────────────────────────────────────────

/// ESI strictly above this is highly sustainable.
pub const HIGHLY_SUSTAINABLE_ESI: f64 = 10.0;
/// ESI strictly above this is sustainable.
pub const SUSTAINABLE_ESI: f64 = 1.0;
/// ESI strictly above this is low sustainability; at or below, unsustainable.
pub const LOW_SUSTAINABILITY_ESI: f64 = 0.1;

// ── SustainabilityAnalyzer ────────────────────────────────────────────────────

/// Stateless derivation of EYR, ELR and ESI from category totals.
pub struct SustainabilityAnalyzer;

impl SustainabilityAnalyzer {
    /// Compute the sustainability ratios for a set of emergy totals.
    ///
    /// R, N and F are read back from their formatted values; an absent
    /// category counts as zero. Fails with
    /// [`EmergyError::DivisionByZero`] when R or F is zero, or when the
    /// totals are too large for the ratios to stay finite.
    pub fn analyze(totals: &EmergyTotals) -> Result<SustainabilityIndicators> {
        let r = Self::category_value(totals, RENEWABLE)?;
        let n = Self::category_value(totals, NONRENEWABLE)?;
        let f = Self::category_value(totals, PURCHASED)?;

        info!("Emergy totals: R: {}, N: {}, F: {}", r, n, f);

        if f == 0.0 || r == 0.0 {
            return Err(EmergyError::DivisionByZero);
        }

        let eyr = (r + n + f) / f;
        let elr = (n + f) / r;
        if elr == 0.0 {
            return Err(EmergyError::DivisionByZero);
        }
        let esi = eyr / elr;

        if !(eyr.is_finite() && elr.is_finite() && esi.is_finite()) {
            warn!(
                "Non-finite indicators from totals R: {}, N: {}, F: {}",
                r, n, f
            );
            return Err(EmergyError::DivisionByZero);
        }

        info!(
            "Indicators computed - EYR: {:.2}, ELR: {:.2}, ESI: {:.2}",
            eyr, elr, esi
        );

        Ok(SustainabilityIndicators {
            eyr: round_to(eyr, 2),
            elr: round_to(elr, 2),
            esi: round_to(esi, 2),
            classification: Self::classify_esi(esi),
        })
    }

    /// Map an ESI onto the ordinal scale. Thresholds are strict, so a value
    /// sitting exactly on one falls into the lower bucket.
    pub fn classify_esi(esi: f64) -> SustainabilityClassification {
        if esi > HIGHLY_SUSTAINABLE_ESI {
            SustainabilityClassification::HighlySustainable
        } else if esi > SUSTAINABLE_ESI {
            SustainabilityClassification::Sustainable
        } else if esi > LOW_SUSTAINABILITY_ESI {
            SustainabilityClassification::LowSustainability
        } else {
            SustainabilityClassification::Unsustainable
        }
    }

    fn category_value(totals: &EmergyTotals, code: &str) -> Result<f64> {
        let Some(entry) = totals.get(code) else {
            return Ok(0.0);
        };
        parse_scientific(&entry.value).ok_or_else(|| {
            EmergyError::internal(anyhow::anyhow!(
                "unparseable emergy total for category {}: {:?}",
                code,
                entry.value
            ))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
