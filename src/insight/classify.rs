//! Rule-based classifiers feeding the insight text.
//!
//! Each classifier returns a tag plus a 0-100 score. Only the tags reach the
//! text today; the scores are logged and kept for ranking contracts later.

use crate::insight::InsightContext;
use crate::state::OptionType;

// ── Time to expiry ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    VeryShort,
    Short,
    Medium,
    Long,
    VeryLong,
}

impl TimeBucket {
    pub fn risk(self) -> u8 {
        match self {
            Self::VeryShort => 90,
            Self::Short => 70,
            Self::Medium => 40,
            Self::Long => 20,
            Self::VeryLong => 10,
        }
    }
}

impl std::fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VeryShort => write!(f, "very short"),
            Self::Short => write!(f, "short"),
            Self::Medium => write!(f, "medium"),
            Self::Long => write!(f, "long"),
            Self::VeryLong => write!(f, "very long"),
        }
    }
}

pub fn classify_time(expiry_days: i64) -> TimeBucket {
    match expiry_days {
        d if d <= 7 => TimeBucket::VeryShort,
        d if d <= 30 => TimeBucket::Short,
        d if d <= 90 => TimeBucket::Medium,
        d if d <= 180 => TimeBucket::Long,
        _ => TimeBucket::VeryLong,
    }
}

// ── Moneyness ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moneyness {
    Atm,
    SlightlyItm,
    SlightlyOtm,
    Itm,
    Otm,
    DeepItm,
    DeepOtm,
}

impl Moneyness {
    pub fn gamma_risk(self) -> u8 {
        match self {
            Self::Atm => 80,
            Self::SlightlyItm | Self::SlightlyOtm => 60,
            Self::Itm | Self::Otm => 40,
            Self::DeepItm | Self::DeepOtm => 20,
        }
    }
}

impl std::fmt::Display for Moneyness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atm => write!(f, "at-the-money"),
            Self::SlightlyItm => write!(f, "slightly in-the-money"),
            Self::SlightlyOtm => write!(f, "slightly out-of-the-money"),
            Self::Itm => write!(f, "in-the-money"),
            Self::Otm => write!(f, "out-of-the-money"),
            Self::DeepItm => write!(f, "deep in-the-money"),
            Self::DeepOtm => write!(f, "deep out-of-the-money"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneynessClass {
    pub bucket: Moneyness,
    /// |1 - moneyness|
    pub atm_pct: f64,
}

/// Moneyness is directional: S/K for calls, K/S for puts, so > 1 means ITM either way.
pub fn classify_moneyness(option_type: OptionType, underlying: f64, strike: f64) -> MoneynessClass {
    let m = match option_type {
        OptionType::Call => underlying / strike,
        OptionType::Put => strike / underlying,
    };
    let atm_pct = (1.0 - m).abs();
    let itm = m > 1.0;

    let bucket = if atm_pct < 0.02 {
        Moneyness::Atm
    } else if atm_pct < 0.05 {
        if itm { Moneyness::SlightlyItm } else { Moneyness::SlightlyOtm }
    } else if atm_pct < 0.15 {
        if itm { Moneyness::Itm } else { Moneyness::Otm }
    } else if itm {
        Moneyness::DeepItm
    } else {
        Moneyness::DeepOtm
    };

    MoneynessClass { bucket, atm_pct }
}

// ── Implied volatility ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvLevel {
    // Relative to historical vol, or absolute level
    ExtremelyExpensive,
    Expensive,
    Fair,
    Cheap,
    Depressed,
    // IV percentile rank
    VeryHigh,
    High,
    Normal,
    Low,
    VeryLow,
}

impl IvLevel {
    pub fn score(self) -> u8 {
        match self {
            Self::ExtremelyExpensive => 95,
            Self::Expensive => 80,
            Self::Fair => 50,
            Self::Cheap => 20,
            Self::Depressed => 10,
            Self::VeryHigh => 90,
            Self::High => 70,
            Self::Normal => 50,
            Self::Low => 30,
            Self::VeryLow => 10,
        }
    }
}

impl std::fmt::Display for IvLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::ExtremelyExpensive => "extremely expensive",
            Self::Expensive => "expensive",
            Self::Fair => "fair",
            Self::Cheap => "cheap",
            Self::Depressed => "depressed",
            Self::VeryHigh => "very high",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::VeryLow => "very low",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IvClass {
    pub level: IvLevel,
    /// Human-readable basis for the level, e.g. "implied volatility 25.0% vs historical volatility 20.0%"
    pub detail: String,
}

/// Percentile rank wins when present, then the IV/HV ratio, then absolute IV.
pub fn classify_iv(iv: f64, historical_vol: Option<f64>, iv_percentile: Option<f64>) -> IvClass {
    if let Some(rank) = iv_percentile {
        let pct = (rank * 100.0).round() as u32;
        let level = if rank >= 0.9 {
            IvLevel::VeryHigh
        } else if rank >= 0.7 {
            IvLevel::High
        } else if rank >= 0.3 {
            IvLevel::Normal
        } else if rank >= 0.1 {
            IvLevel::Low
        } else {
            IvLevel::VeryLow
        };
        return IvClass {
            level,
            detail: format!("{} percentile", ordinal(pct)),
        };
    }

    if let Some(hv) = historical_vol.filter(|hv| *hv > 0.0) {
        let ratio = iv / hv;
        let level = if ratio > 2.0 {
            IvLevel::ExtremelyExpensive
        } else if ratio > 1.5 {
            IvLevel::Expensive
        } else if ratio > 0.8 {
            IvLevel::Fair
        } else if ratio > 0.5 {
            IvLevel::Cheap
        } else {
            IvLevel::Depressed
        };
        return IvClass {
            level,
            detail: format!(
                "implied volatility {:.1}% vs historical volatility {:.1}%",
                iv * 100.0,
                hv * 100.0
            ),
        };
    }

    let level = if iv > 0.6 {
        IvLevel::ExtremelyExpensive
    } else if iv > 0.4 {
        IvLevel::Expensive
    } else if iv > 0.2 {
        IvLevel::Fair
    } else if iv > 0.1 {
        IvLevel::Cheap
    } else {
        IvLevel::Depressed
    };
    IvClass {
        level,
        detail: format!("implied volatility {:.1}%", iv * 100.0),
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

// ── Theta decay ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayLevel {
    Severe,
    High,
    Moderate,
    Low,
}

impl DecayLevel {
    pub fn score(self) -> u8 {
        match self {
            Self::Severe => 90,
            Self::High => 70,
            Self::Moderate => 50,
            Self::Low => 20,
        }
    }
}

impl std::fmt::Display for DecayLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Severe => write!(f, "severe"),
            Self::High => write!(f, "high"),
            Self::Moderate => write!(f, "moderate"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaClass {
    pub level: DecayLevel,
    /// Daily decay as a fraction of the premium
    pub decay_pct: f64,
}

pub fn classify_theta(theta: f64, premium: f64) -> ThetaClass {
    let decay_pct = if premium > 0.0 { theta.abs() / premium } else { 0.0 };
    let level = if decay_pct > 0.15 {
        DecayLevel::Severe
    } else if decay_pct > 0.08 {
        DecayLevel::High
    } else if decay_pct > 0.03 {
        DecayLevel::Moderate
    } else {
        DecayLevel::Low
    };
    ThetaClass { level, decay_pct }
}

// ── Liquidity ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liquidity {
    Good,
    Ok,
    Poor,
}

impl std::fmt::Display for Liquidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Ok => write!(f, "ok"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityClass {
    pub tag: Liquidity,
    pub score: u8,
}

/// Spread-based liquidity bucket. Open interest, when known, must also clear a floor.
pub fn classify_liquidity(bid: f64, ask: f64, open_interest: Option<u64>) -> LiquidityClass {
    let mid = (bid + ask) / 2.0;
    let spread_pct = if mid > 0.0 { (ask - bid) / mid } else { f64::INFINITY };
    let oi_above = |floor: u64| open_interest.map_or(true, |oi| oi > floor);

    let (tag, score) = if spread_pct < 0.02 && oi_above(100) {
        (Liquidity::Good, 10)
    } else if spread_pct < 0.05 && oi_above(50) {
        (Liquidity::Ok, 30)
    } else if spread_pct < 0.10 {
        (Liquidity::Poor, 70)
    } else {
        (Liquidity::Poor, 90)
    };
    LiquidityClass { tag, score }
}

/// Quote used when no market bid/ask is available: +/-2% around the premium.
#[inline]
pub fn synthetic_quote(premium: f64) -> (f64, f64) {
    (premium * 0.98, premium * 1.02)
}

// ── All classifications for one analysis ──

#[derive(Debug, Clone, PartialEq)]
pub struct Classifications {
    pub time: TimeBucket,
    pub moneyness: MoneynessClass,
    pub iv: IvClass,
    pub theta: ThetaClass,
    pub liquidity: LiquidityClass,
}

pub fn classify(ctx: &InsightContext) -> Classifications {
    let (bid, ask) = synthetic_quote(ctx.premium);
    Classifications {
        time: classify_time(ctx.expiry_days),
        moneyness: classify_moneyness(ctx.option_type, ctx.underlying, ctx.strike),
        iv: classify_iv(ctx.iv, ctx.historical_vol, ctx.iv_percentile),
        theta: classify_theta(ctx.theta, ctx.premium),
        liquidity: classify_liquidity(bid, ask, None),
    }
}
